//! Full lifecycle scenarios over a standard deployment

use std::sync::Arc;

use bytes::Bytes;
use leased_names_core::controller::PriceOracle;
use leased_names_core::events::{Event, RegistrarEvent};
use leased_names_core::resolver::{ResolverCall, ADDR_KEY, NAME_KEY};
use leased_names_core::utils::ManualClock;
use leased_names_core::{
    Address, CertificateNotice, CoreConfig, CoreError, GasMeter, HolderHooks, HookError, NameService, NameStatus,
    RegistrationReceipt, RegistrationRequest, RegistryCall, UnregisterStep,
};
use leased_names_periphery::{deploy_standard, ExponentialPremiumOracle, FixedPriceOracle, PeripheryError};

const DAY: u64 = 24 * 60 * 60;
const YEAR: u64 = 365 * DAY;
const GRACE: u64 = 90 * DAY;

struct World {
    service: NameService,
    clock: ManualClock,
    admin: Address,
    public_resolver: Address,
}

impl World {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let admin = Address::from([1; 20]);
        let config = CoreConfig::testing();
        let clock = ManualClock::new(0);
        let deployed = deploy_standard(&config, admin, Arc::new(rent_table())).unwrap();
        let public_resolver = deployed.public_resolver;
        let service = NameService::new(deployed.state, Arc::new(clock.clone()), config);

        World {
            service,
            clock,
            admin,
            public_resolver,
        }
    }

    /// Commit now, reveal 70 seconds later
    fn buy(&self, request: &RegistrationRequest, value: u128) -> leased_names_core::Result<RegistrationReceipt> {
        let commitment = self
            .service
            .read(|state, _| state.controller().make_commitment_with_config(request))??;
        self.service.commit(request.owner, commitment)?;
        self.clock.advance(70);
        self.service.register(request.owner, value, request)
    }

    fn attach(&self, identity: Address, hooks: Arc<dyn HolderHooks>) {
        self.service
            .transact(self.admin, 0, |state, _| {
                state.attach_hooks(identity, hooks);
                Ok(())
            })
            .unwrap();
    }
}

/// 5 units a year for names of five or more characters
fn rent_table() -> FixedPriceOracle {
    FixedPriceOracle::new(vec![0, 0, 640, 160, 5]).unwrap()
}

fn addr(n: u8) -> Address {
    Address::from([n; 20])
}

#[derive(Debug)]
struct Greedy;

impl HolderHooks for Greedy {
    fn on_certificate_burned(&self, _: &CertificateNotice, meter: &mut GasMeter) -> Result<(), HookError> {
        loop {
            meter.charge(1)?;
        }
    }
}

#[derive(Debug)]
struct Panicky;

impl HolderHooks for Panicky {
    fn on_certificate_burned(&self, _: &CertificateNotice, _: &mut GasMeter) -> Result<(), HookError> {
        panic!("you cannot take this from me")
    }
}

#[test]
fn test_alice_full_lifecycle() -> anyhow::Result<()> {
    let world = World::new();
    let (alice, bob) = (addr(2), addr(3));

    let request = RegistrationRequest::new("alice", alice, YEAR, [42; 32]).with_resolver(
        world.public_resolver,
        Some(alice),
        true,
    );
    let receipt = world.buy(&request, 5)?;
    assert_eq!(receipt.expires, 70 + YEAR);
    assert_eq!(receipt.refund, 0);

    let node = world.service.read(|state, _| state.namehash("alice.test")).unwrap();
    assert_eq!(receipt.node, node);
    assert_eq!(world.service.read(|state, _| state.registry().owner(&node)).unwrap(), alice);
    assert_eq!(
        world.service.resolve("alice.test", ADDR_KEY).unwrap(),
        Some(Bytes::copy_from_slice(alice.as_bytes()))
    );

    let reverse_node = receipt.reverse_node.unwrap();
    let reverse_name = world
        .service
        .read(|state, _| state.resolvers().get_data(&world.public_resolver, &reverse_node, NAME_KEY))
        .unwrap();
    assert_eq!(reverse_name, Some(Bytes::from_static(b"alice.test")));

    // Grace: holder query fails but the name is still reserved
    world.clock.set(receipt.expires + 1);
    assert!(matches!(world.service.owner_of("alice"), Err(CoreError::NameExpired(_))));
    assert!(!world.service.available("alice").unwrap());

    // Released: someone else may take it
    world.clock.set(receipt.expires + GRACE);
    assert!(world.service.available("alice").unwrap());
    let request = RegistrationRequest::new("alice", bob, YEAR, [43; 32]);
    world.buy(&request, 5)?;
    assert_eq!(world.service.owner_of("alice")?, bob);
    assert_eq!(world.service.read(|state, _| state.registry().owner(&node))?, bob);
    Ok(())
}

#[test]
fn test_hostile_former_holders_cannot_block_reassignment() {
    let world = World::new();
    let (greedy, panicky, next) = (addr(5), addr(6), addr(7));
    world.attach(greedy, Arc::new(Greedy));
    world.attach(panicky, Arc::new(Panicky));

    let lapsed = world.buy(&RegistrationRequest::new("vault", greedy, YEAR, [1; 32]), 5).unwrap();
    world.buy(&RegistrationRequest::new("chest", panicky, YEAR, [2; 32]), 5).unwrap();

    // The panicking holder burns its own name; the hook cannot undo it
    assert!(matches!(
        world.service.unregister(panicky, "chest").unwrap(),
        UnregisterStep::Requested { .. }
    ));
    world.clock.advance(DAY);
    assert_eq!(
        world.service.unregister(panicky, "chest").unwrap(),
        UnregisterStep::Burned { holder: panicky }
    );
    assert_eq!(world.service.read(|state, now| state.status("chest", now)).unwrap(), NameStatus::Grace);

    // The greedy holder's name lapses and is re-registered
    world.clock.set(lapsed.expires + GRACE);
    world.buy(&RegistrationRequest::new("vault", next, YEAR, [3; 32]), 5).unwrap();
    assert_eq!(world.service.owner_of("vault").unwrap(), next);

    world.clock.advance(GRACE);
    world.buy(&RegistrationRequest::new("chest", next, YEAR, [4; 32]), 5).unwrap();
    assert_eq!(world.service.owner_of("chest").unwrap(), next);
}

#[test]
fn test_insufficient_payment_mutates_nothing() {
    let world = World::new();
    let request = RegistrationRequest::new("alice", addr(2), YEAR, [9; 32]);
    let commitment = world
        .service
        .read(|state, _| state.controller().make_commitment_with_config(&request))
        .unwrap()
        .unwrap();
    world.service.commit(addr(2), commitment).unwrap();
    world.clock.advance(70);
    let events_before = world.service.events().unwrap().len();

    assert!(matches!(
        world.service.register(addr(2), 4, &request),
        Err(CoreError::InsufficientValue { required: 5, provided: 4 })
    ));
    assert_eq!(world.service.events().unwrap().len(), events_before);
    assert!(world.service.available("alice").unwrap());
    assert!(world
        .service
        .read(|state, _| state.controller().committed_at(&commitment))
        .unwrap()
        .is_some());

    // The same commitment still works with the right payment
    world.service.register(addr(2), 5, &request).unwrap();
}

#[test]
fn test_overpayment_refunded_exactly() {
    let world = World::new();
    let receipt = world
        .buy(&RegistrationRequest::new("abcd", addr(2), 2 * YEAR, [9; 32]), 1_000)
        .unwrap();
    assert_eq!(receipt.price.total(), 320);
    assert_eq!(receipt.refund, 680);
    assert_eq!(world.service.read(|state, _| state.controller().collected()).unwrap(), 320);

    let renewal = world.service.renew(addr(8), 200, "abcd", YEAR).unwrap();
    assert_eq!(renewal.cost, 160);
    assert_eq!(renewal.refund, 40);
    assert_eq!(renewal.expires, receipt.expires + YEAR);
}

#[test]
fn test_released_name_carries_premium() {
    let world = World::new();
    let lapsed = world.buy(&RegistrationRequest::new("alice", addr(2), YEAR, [1; 32]), 5).unwrap();

    let oracle: Arc<dyn PriceOracle> = Arc::new(ExponentialPremiumOracle::new(
        rent_table(),
        1_000_000,
        21,
        GRACE,
        Arc::new(world.clock.clone()),
    ));
    world
        .service
        .transact(world.admin, 0, |state, ctx| state.controller_mut().set_price_oracle(ctx, oracle))
        .unwrap();

    // Commit so that the reveal lands exactly on release
    world.clock.set(lapsed.expires + GRACE - 70);
    let request = RegistrationRequest::new("alice", addr(3), YEAR, [2; 32]);
    assert!(matches!(
        world.buy(&request, 5),
        Err(CoreError::InsufficientValue { required, .. }) if required > 5
    ));

    let quoted = world
        .service
        .read(|state, _| state.controller().rent_price(state.registrar(), "alice", YEAR))
        .unwrap();
    world.service.register(addr(3), quoted.total(), &request).unwrap();
    assert_eq!(world.service.owner_of("alice").unwrap(), addr(3));
}

#[test]
fn test_transfer_follows_into_registry() {
    let world = World::new();
    let (alice, bob) = (addr(2), addr(3));
    world.buy(&RegistrationRequest::new("alice", alice, YEAR, [1; 32]), 5).unwrap();

    world.service.unregister(alice, "alice").unwrap();
    world.service.transfer(alice, alice, bob, "alice").unwrap();

    let label = world.service.label_hash("alice").unwrap();
    let (owner, pending) = world
        .service
        .read(|state, _| {
            let node = state.registrar().node_of(&label);
            (state.registry().owner(&node), state.registrar().pending_unregister_at(&label))
        })
        .unwrap();
    assert_eq!(owner, bob);
    assert_eq!(pending, None);

    let transfers = world
        .service
        .events()
        .unwrap()
        .into_iter()
        .filter(|r| matches!(r.event, Event::Registrar(RegistrarEvent::Transfer { .. })))
        .count();
    assert_eq!(transfers, 1);
}

#[test]
fn test_owner_batch_is_atomic() {
    let world = World::new();
    let alice = addr(2);
    let receipt = world.buy(&RegistrationRequest::new("alice", alice, YEAR, [1; 32]), 5).unwrap();
    let node = receipt.node;
    let resolver = world.public_resolver;

    let set_url = ResolverCall::SetData {
        node,
        key: "url".to_string(),
        value: Bytes::from_static(b"https://alice.example"),
    }
    .encode()
    .unwrap();
    let calls = vec![
        RegistryCall::SetTtl { node, ttl: 3_600 }.encode().unwrap(),
        RegistryCall::SetRecordWithResolverData {
            node,
            owner: alice,
            resolver,
            ttl: 3_600,
            data: vec![set_url],
        }
        .encode()
        .unwrap(),
    ];
    world
        .service
        .transact(alice, 0, |state, ctx| state.execute_batch(ctx, &calls))
        .unwrap();
    assert_eq!(
        world.service.resolve("alice.test", "url").unwrap(),
        Some(Bytes::from_static(b"https://alice.example"))
    );

    // A stranger's batch fails as a whole
    let hijack = vec![RegistryCall::SetOwner { node, owner: addr(9) }.encode().unwrap()];
    assert!(world
        .service
        .transact(addr(9), 0, |state, ctx| state.execute_batch(ctx, &hijack))
        .is_err());
    assert_eq!(world.service.read(|state, _| state.registry().owner(&node)).unwrap(), alice);
}

#[test]
fn test_root_admin_assigns_top_level_labels() {
    let admin = Address::from([1; 20]);
    let config = CoreConfig::testing();
    let mut deployed = deploy_standard(&config, admin, Arc::new(rent_table())).unwrap();
    let hasher = *deployed.state.registry().hasher();

    let node = deployed
        .root
        .set_sub_name_owner(deployed.state.registry_mut(), admin, hasher.label_hash("org"), addr(4))
        .unwrap();
    assert_eq!(deployed.state.registry().owner(&node), addr(4));

    let err = deployed
        .root
        .set_sub_name_owner(deployed.state.registry_mut(), admin, hasher.label_hash("test"), addr(4))
        .unwrap_err();
    assert!(matches!(err, PeripheryError::Locked(_)));
}
