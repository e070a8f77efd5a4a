//! Naming state
//!
//! [`NamingState`] owns every component of the name service and wires the
//! cross-component operations together. Each operation runs against an
//! explicit [`TxContext`]; the state itself has no notion of time or
//! atomicity, which [`crate::service::NameService`] layers on top.

use std::sync::Arc;
use bytes::Bytes;
use log::info;
use serde::{Deserialize, Serialize};

use crate::accounts::{AccountDirectory, HolderHooks};
use crate::config::CoreConfig;
use crate::controller::{Controller, PriceOracle, RegistrationReceipt, RegistrationRequest, RenewalReceipt};
use crate::crypto::{self, HashAlgorithm};
use crate::error::Result;
use crate::events::Event;
use crate::namehash::NameHasher;
use crate::registrar::{Ledger, NameStatus, Registrar, UnregisterStep};
use crate::registry::Registry;
use crate::resolver::{Resolver, ResolverCall, ResolverDirectory};
use crate::reverse::ReverseRegistrar;
use crate::types::{Address, LabelHash, NodeId, Timestamp, TxContext};

/// Identities of the core components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Initial root owner and administrator of every component
    pub admin: Address,

    /// Registry identity
    pub registry: Address,

    /// Registrar identity
    pub registrar: Address,

    /// Controller identity
    pub controller: Address,
}

impl Deployment {
    /// Component identities derived from fixed tags
    pub fn new(admin: Address) -> Self {
        Deployment {
            admin,
            registry: derive_identity("registry"),
            registrar: derive_identity("registrar"),
            controller: derive_identity("controller"),
        }
    }
}

/// Identity derived from the last 20 bytes of a tagged hash
pub fn derive_identity(tag: &str) -> Address {
    let digest = crypto::digest(HashAlgorithm::Keccak256, format!("leased-names/{}", tag).as_bytes());
    Address::from_slice(&digest[12..])
}

/// All components of the name service
#[derive(Debug, Clone)]
pub struct NamingState {
    registry: Registry,
    resolvers: ResolverDirectory,
    accounts: AccountDirectory,
    registrar: Registrar,
    controller: Controller,
    reverse: Option<Box<dyn ReverseRegistrar>>,
}

impl NamingState {
    /// Deploy the core components
    ///
    /// The admin owns the root; the registrar is handed the base namespace
    /// and the controller is authorized on the registrar.
    pub fn bootstrap(config: &CoreConfig, deployment: Deployment, oracle: Arc<dyn PriceOracle>) -> Result<Self> {
        let hasher = NameHasher::new(config.hashing.algorithm);
        let admin = deployment.admin;

        let mut registry = Registry::new(deployment.registry, admin, hasher);
        let mut registrar = Registrar::new(deployment.registrar, admin, hasher, &config.registrar);
        let controller = Controller::new(deployment.controller, admin, hasher, oracle, &config.controller);

        let base_label = hasher.label_hash(&config.registrar.base_name);
        registry.set_subnode_owner(admin, NodeId::ROOT, base_label, registrar.address())?;
        registrar.add_controller(&TxContext::new(admin, 0), controller.address())?;

        let mut state = NamingState {
            registry,
            resolvers: ResolverDirectory::new(),
            accounts: AccountDirectory::new(),
            registrar,
            controller,
            reverse: None,
        };
        // Deployment is not a user transaction
        state.take_events();

        info!("Naming state bootstrapped with admin {:?}", admin);
        Ok(state)
    }

    /// The registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The registry, for single-component writes
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Installed resolvers
    pub fn resolvers(&self) -> &ResolverDirectory {
        &self.resolvers
    }

    /// Holder hooks
    pub fn accounts(&self) -> &AccountDirectory {
        &self.accounts
    }

    /// The registrar
    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// The registrar, for single-component writes
    pub fn registrar_mut(&mut self) -> &mut Registrar {
        &mut self.registrar
    }

    /// The controller
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// The controller, for single-component writes
    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// The reverse registrar, if installed
    pub fn reverse_registrar(&self) -> Option<&dyn ReverseRegistrar> {
        self.reverse.as_deref()
    }

    /// Make a resolver reachable under `handle`
    pub fn install_resolver(&mut self, handle: Address, resolver: Box<dyn Resolver>) {
        self.resolvers.install(handle, resolver);
    }

    /// Attach hooks to an identity
    pub fn attach_hooks(&mut self, identity: Address, hooks: Arc<dyn HolderHooks>) {
        self.accounts.attach(identity, hooks);
    }

    /// Install the reverse registrar used for reverse records
    pub fn set_reverse_registrar(&mut self, reverse: Box<dyn ReverseRegistrar>) {
        info!("Reverse registrar {:?} installed", reverse.address());
        self.reverse = Some(reverse);
    }

    /// Label hash under the configured algorithm
    pub fn label_hash(&self, label: &str) -> LabelHash {
        self.registry.hasher().label_hash(label)
    }

    /// Identifier of a dotted name under the configured algorithm
    pub fn namehash(&self, name: &str) -> NodeId {
        self.registry.hasher().namehash(name)
    }

    /// Read `key` of a dotted name through its resolver
    pub fn resolve(&self, name: &str, key: &str) -> Option<Bytes> {
        let node = self.namehash(name);
        self.resolvers.get_data(&self.registry.resolver(&node), &node, key)
    }

    /// Whether a plaintext name can be registered
    pub fn available(&self, name: &str, now: Timestamp) -> bool {
        self.controller.available(&self.registrar, name, now)
    }

    /// Lifecycle phase of a plaintext name
    pub fn status(&self, name: &str, now: Timestamp) -> NameStatus {
        self.registrar.status(&self.label_hash(name), now)
    }

    /// Publish a registration commitment
    pub fn commit(&mut self, ctx: &TxContext, commitment: [u8; 32]) -> Result<()> {
        self.controller.commit(ctx, commitment)
    }

    /// Reveal a commitment and register
    pub fn register(&mut self, ctx: &TxContext, request: &RegistrationRequest) -> Result<RegistrationReceipt> {
        let mut ledger = Ledger {
            registry: &mut self.registry,
            resolvers: &mut self.resolvers,
            accounts: &self.accounts,
        };
        self.controller
            .register(&mut self.registrar, &mut ledger, self.reverse.as_mut(), ctx, request)
    }

    /// Renew a name through the controller
    pub fn renew(&mut self, ctx: &TxContext, name: &str, duration: u64) -> Result<RenewalReceipt> {
        self.controller.renew(&mut self.registrar, ctx, name, duration)
    }

    /// One step of the two-step burn
    pub fn unregister(&mut self, ctx: &TxContext, label: LabelHash) -> Result<UnregisterStep> {
        self.registrar.unregister(&self.accounts, ctx, label)
    }

    /// Move a certificate
    pub fn transfer_from(&mut self, ctx: &TxContext, from: Address, to: Address, label: LabelHash) -> Result<()> {
        self.registrar.transfer_from(&mut self.registry, ctx, from, to, label)
    }

    /// Move a certificate and offer it to the recipient's hooks
    pub fn safe_transfer_from(
        &mut self,
        ctx: &TxContext,
        from: Address,
        to: Address,
        label: LabelHash,
        data: Bytes,
    ) -> Result<()> {
        let mut ledger = Ledger {
            registry: &mut self.registry,
            resolvers: &mut self.resolvers,
            accounts: &self.accounts,
        };
        self.registrar.safe_transfer_from(&mut ledger, ctx, from, to, label, data)
    }

    /// Point the registry owner of a certificate's name elsewhere
    pub fn reclaim(&mut self, ctx: &TxContext, label: LabelHash, owner: Address) -> Result<()> {
        self.registrar.reclaim(&mut self.registry, ctx, label, owner)
    }

    /// Set the resolver of the registrar's base node
    pub fn set_base_resolver(&mut self, ctx: &TxContext, resolver: Address) -> Result<()> {
        self.registrar.set_base_resolver(&mut self.registry, ctx, resolver)
    }

    /// Registry `set_record` plus forwarded resolver data
    pub fn set_record_with_resolver_data(
        &mut self,
        ctx: &TxContext,
        node: NodeId,
        owner: Address,
        resolver: Address,
        ttl: u64,
        data: &[Bytes],
    ) -> Result<()> {
        self.registry
            .set_record_with_resolver_data(&mut self.resolvers, ctx.sender, node, owner, resolver, ttl, data)
    }

    /// Registry `set_sub_record` plus forwarded resolver data
    #[allow(clippy::too_many_arguments)]
    pub fn set_sub_record_with_resolver_data(
        &mut self,
        ctx: &TxContext,
        parent: NodeId,
        label: LabelHash,
        owner: Address,
        resolver: Address,
        ttl: u64,
        data: &[Bytes],
    ) -> Result<NodeId> {
        self.registry.set_sub_record_with_resolver_data(
            &mut self.resolvers,
            ctx.sender,
            parent,
            label,
            owner,
            resolver,
            ttl,
            data,
        )
    }

    /// Atomic batch of registry calls
    pub fn execute_batch(&mut self, ctx: &TxContext, calls: &[Bytes]) -> Result<()> {
        self.registry.execute_batch(&mut self.resolvers, ctx.sender, calls)
    }

    /// Send a call straight to the resolver under `handle`
    pub fn call_resolver(&mut self, ctx: &TxContext, handle: Address, call: &ResolverCall) -> Result<()> {
        self.resolvers.forward(&self.registry, ctx.sender, &handle, call)
    }

    /// Run the reverse registrar with the registry and resolvers
    pub fn with_reverse_registrar<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut dyn ReverseRegistrar, &mut Registry, &mut ResolverDirectory) -> T,
    {
        let reverse = self.reverse.as_deref_mut()?;
        Some(f(reverse, &mut self.registry, &mut self.resolvers))
    }

    /// Collect the events of every component, registry first
    pub fn take_events(&mut self) -> Vec<Event> {
        let mut events: Vec<Event> = self.registry.take_events().into_iter().map(Event::Registry).collect();
        events.extend(self.registrar.take_events().into_iter().map(Event::Registrar));
        events.extend(self.controller.take_events().into_iter().map(Event::Controller));
        events
    }
}
