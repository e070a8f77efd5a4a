//! Namespace registry
//!
//! The registry is the sole source of truth for the owner, resolver and TTL
//! of every name identifier. Records are created implicitly on first write
//! and never deleted; assigning the null identity as owner marks a record
//! unowned.
//!
//! Authorization is delegated hierarchically: whoever is authorized on a
//! parent may mint arbitrary children under it. The authorized set of a
//! record is computed fresh on every call from the record's current owner
//! and that owner's operators, see [`Registry::authorized_callers`].

mod call;

pub use call::RegistryCall;

use std::collections::{HashMap, HashSet};
use bytes::Bytes;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::events::RegistryEvent;
use crate::namehash::NameHasher;
use crate::resolver::{ResolverCall, ResolverDirectory};
use crate::types::{Address, LabelHash, NodeId};

/// Owner, resolver and TTL of a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NameRecord {
    /// Owning identity; null means unowned
    pub owner: Address,

    /// Handle of the resolver holding the name's values
    pub resolver: Address,

    /// Cache lifetime in seconds
    pub ttl: u64,
}

/// Identities allowed to modify a record at the time of the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedCallers {
    /// Current owner
    pub owner: Address,

    /// Operators approved by the current owner
    pub operators: HashSet<Address>,
}

impl AuthorizedCallers {
    /// Whether `caller` is in the set
    pub fn contains(&self, caller: &Address) -> bool {
        if self.owner.is_zero() || caller.is_zero() {
            return false;
        }
        self.owner == *caller || self.operators.contains(caller)
    }
}

/// The namespace registry
#[derive(Debug, Clone)]
pub struct Registry {
    /// Identity the registry calls resolvers as
    address: Address,

    /// Identifier derivation
    hasher: NameHasher,

    /// Records by identifier
    records: HashMap<NodeId, NameRecord>,

    /// owner -> approved operators
    operators: HashMap<Address, HashSet<Address>>,

    /// Raised and not yet collected events
    events: Vec<RegistryEvent>,
}

impl Registry {
    /// Create a registry whose root record is owned by `root_owner`
    pub fn new(address: Address, root_owner: Address, hasher: NameHasher) -> Self {
        let mut records = HashMap::new();
        records.insert(
            NodeId::ROOT,
            NameRecord {
                owner: root_owner,
                ..NameRecord::default()
            },
        );
        info!("Registry {:?} initialized with root owner {:?}", address, root_owner);

        Registry {
            address,
            hasher,
            records,
            operators: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Identity of the registry itself
    pub fn address(&self) -> Address {
        self.address
    }

    /// Identifier derivation used by the registry
    pub fn hasher(&self) -> &NameHasher {
        &self.hasher
    }

    /// Record of `node`; zero-valued if never written
    pub fn get_record(&self, node: &NodeId) -> NameRecord {
        self.records.get(node).copied().unwrap_or_default()
    }

    /// Owner of `node`
    pub fn owner(&self, node: &NodeId) -> Address {
        self.get_record(node).owner
    }

    /// Resolver of `node`
    pub fn resolver(&self, node: &NodeId) -> Address {
        self.get_record(node).resolver
    }

    /// TTL of `node`
    pub fn ttl(&self, node: &NodeId) -> u64 {
        self.get_record(node).ttl
    }

    /// Whether `node` was ever written
    pub fn record_exists(&self, node: &NodeId) -> bool {
        self.records.contains_key(node)
    }

    /// Whether `operator` acts for `owner`
    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operators
            .get(owner)
            .map_or(false, |ops| ops.contains(operator))
    }

    /// The identities currently allowed to modify `node`
    pub fn authorized_callers(&self, node: &NodeId) -> AuthorizedCallers {
        let owner = self.owner(node);
        AuthorizedCallers {
            owner,
            operators: self.operators.get(&owner).cloned().unwrap_or_default(),
        }
    }

    /// Whether `caller` may modify `node`
    pub fn is_authorized(&self, node: &NodeId, caller: &Address) -> bool {
        self.authorized_callers(node).contains(caller)
    }

    fn authorize(&self, node: &NodeId, caller: &Address) -> Result<()> {
        if self.is_authorized(node, caller) {
            Ok(())
        } else {
            Err(CoreError::NotAuthorized {
                node: *node,
                caller: *caller,
            })
        }
    }

    /// Transfer ownership of `node`
    pub fn set_owner(&mut self, caller: Address, node: NodeId, owner: Address) -> Result<()> {
        self.authorize(&node, &caller)?;
        self.write_owner(node, owner);
        Ok(())
    }

    /// Point `node` at a resolver
    pub fn set_resolver(&mut self, caller: Address, node: NodeId, resolver: Address) -> Result<()> {
        self.authorize(&node, &caller)?;
        self.write_resolver(node, resolver);
        Ok(())
    }

    /// Set the TTL of `node`
    pub fn set_ttl(&mut self, caller: Address, node: NodeId, ttl: u64) -> Result<()> {
        self.authorize(&node, &caller)?;
        self.write_ttl(node, ttl);
        Ok(())
    }

    /// Set owner, resolver and TTL of `node` in one step
    pub fn set_record(
        &mut self,
        caller: Address,
        node: NodeId,
        owner: Address,
        resolver: Address,
        ttl: u64,
    ) -> Result<()> {
        self.authorize(&node, &caller)?;
        self.write_owner(node, owner);
        self.write_resolver(node, resolver);
        self.write_ttl(node, ttl);
        Ok(())
    }

    /// Assign the owner of the child `label` under `parent`
    pub fn set_subnode_owner(
        &mut self,
        caller: Address,
        parent: NodeId,
        label: LabelHash,
        owner: Address,
    ) -> Result<NodeId> {
        self.authorize(&parent, &caller)?;
        Ok(self.write_subnode_owner(parent, label, owner))
    }

    /// Set the full record of the child `label` under `parent`
    #[allow(clippy::too_many_arguments)]
    pub fn set_sub_record(
        &mut self,
        caller: Address,
        parent: NodeId,
        label: LabelHash,
        owner: Address,
        resolver: Address,
        ttl: u64,
    ) -> Result<NodeId> {
        self.authorize(&parent, &caller)?;
        let child = self.write_subnode_owner(parent, label, owner);
        self.write_resolver(child, resolver);
        self.write_ttl(child, ttl);
        Ok(child)
    }

    /// Approve or revoke `operator` for all of the caller's names
    pub fn set_approval_for_all(&mut self, caller: Address, operator: Address, approved: bool) {
        let ops = self.operators.entry(caller).or_default();
        if approved {
            ops.insert(operator);
        } else {
            ops.remove(&operator);
        }
        self.events.push(RegistryEvent::ApprovalForAll {
            owner: caller,
            operator,
            approved,
        });
    }

    /// `set_record`, then forward resolver calls targeting `node`
    #[allow(clippy::too_many_arguments)]
    pub fn set_record_with_resolver_data(
        &mut self,
        resolvers: &mut ResolverDirectory,
        caller: Address,
        node: NodeId,
        owner: Address,
        resolver: Address,
        ttl: u64,
        data: &[Bytes],
    ) -> Result<()> {
        self.authorize(&node, &caller)?;
        let calls = Self::decode_for(&node, resolver, resolvers, data)?;

        self.write_owner(node, owner);
        self.write_resolver(node, resolver);
        self.write_ttl(node, ttl);

        self.forward(resolvers, &node, &calls)
    }

    /// `set_sub_record`, then forward resolver calls targeting the child
    #[allow(clippy::too_many_arguments)]
    pub fn set_sub_record_with_resolver_data(
        &mut self,
        resolvers: &mut ResolverDirectory,
        caller: Address,
        parent: NodeId,
        label: LabelHash,
        owner: Address,
        resolver: Address,
        ttl: u64,
        data: &[Bytes],
    ) -> Result<NodeId> {
        self.authorize(&parent, &caller)?;
        let child = self.hasher.child_node(&parent, &label);
        let calls = Self::decode_for(&child, resolver, resolvers, data)?;

        self.write_subnode_owner(parent, label, owner);
        self.write_resolver(child, resolver);
        self.write_ttl(child, ttl);

        self.forward(resolvers, &child, &calls)?;
        Ok(child)
    }

    /// Execute encoded self-calls atomically in the caller's context
    ///
    /// The first failure restores the registry and resolvers to their
    /// state before the batch and is returned unchanged; a call that does
    /// not decode fails with [`CoreError::BatchCallFailed`].
    pub fn execute_batch(
        &mut self,
        resolvers: &mut ResolverDirectory,
        caller: Address,
        calls: &[Bytes],
    ) -> Result<()> {
        if calls.is_empty() {
            return Err(CoreError::EmptyBatch);
        }

        let registry_snapshot = self.clone();
        let resolvers_snapshot = resolvers.clone();

        for (index, raw) in calls.iter().enumerate() {
            let result = RegistryCall::decode(raw)
                .map_err(|_| CoreError::BatchCallFailed(index))
                .and_then(|call| self.dispatch(resolvers, caller, call));

            if let Err(e) = result {
                debug!("Batch from {:?} aborted at call {}: {}", caller, index, e);
                *self = registry_snapshot;
                *resolvers = resolvers_snapshot;
                return Err(e);
            }
        }

        Ok(())
    }

    /// Collect raised events
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    fn dispatch(
        &mut self,
        resolvers: &mut ResolverDirectory,
        caller: Address,
        call: RegistryCall,
    ) -> Result<()> {
        match call {
            RegistryCall::SetRecord { node, owner, resolver, ttl } => {
                self.set_record(caller, node, owner, resolver, ttl)
            }
            RegistryCall::SetSubRecord { parent, label, owner, resolver, ttl } => {
                self.set_sub_record(caller, parent, label, owner, resolver, ttl).map(|_| ())
            }
            RegistryCall::SetSubnodeOwner { parent, label, owner } => {
                self.set_subnode_owner(caller, parent, label, owner).map(|_| ())
            }
            RegistryCall::SetOwner { node, owner } => self.set_owner(caller, node, owner),
            RegistryCall::SetResolver { node, resolver } => self.set_resolver(caller, node, resolver),
            RegistryCall::SetTtl { node, ttl } => self.set_ttl(caller, node, ttl),
            RegistryCall::SetApprovalForAll { operator, approved } => {
                self.set_approval_for_all(caller, operator, approved);
                Ok(())
            }
            RegistryCall::SetRecordWithResolverData { node, owner, resolver, ttl, data } => {
                self.set_record_with_resolver_data(resolvers, caller, node, owner, resolver, ttl, &data)
            }
            RegistryCall::SetSubRecordWithResolverData { parent, label, owner, resolver, ttl, data } => self
                .set_sub_record_with_resolver_data(resolvers, caller, parent, label, owner, resolver, ttl, &data)
                .map(|_| ()),
        }
    }

    /// Decode resolver payloads and check each targets `node`
    fn decode_for(
        node: &NodeId,
        resolver: Address,
        resolvers: &ResolverDirectory,
        data: &[Bytes],
    ) -> Result<Vec<ResolverCall>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        if resolver.is_zero() {
            return Err(CoreError::ResolverRequiredWhenDataSupplied);
        }
        if !resolvers.contains(&resolver) {
            return Err(CoreError::ResolverNotFound(resolver));
        }

        data.iter()
            .map(|raw| {
                let call = ResolverCall::decode(raw)?;
                if call.node() != *node {
                    return Err(CoreError::ResolverNodeMismatch {
                        expected: *node,
                        found: call.node(),
                    });
                }
                Ok(call)
            })
            .collect()
    }

    fn forward(&self, resolvers: &mut ResolverDirectory, node: &NodeId, calls: &[ResolverCall]) -> Result<()> {
        for call in calls {
            // Re-read after every forward; the record is the authority, not the argument
            let handle = self.resolver(node);
            resolvers.forward(self, self.address, &handle, call)?;
        }
        Ok(())
    }

    fn write_subnode_owner(&mut self, parent: NodeId, label: LabelHash, owner: Address) -> NodeId {
        let child = self.hasher.child_node(&parent, &label);
        self.records.entry(child).or_default().owner = owner;
        self.events.push(RegistryEvent::NewOwner { parent, label, owner });
        child
    }

    fn write_owner(&mut self, node: NodeId, owner: Address) {
        let record = self.records.entry(node).or_default();
        if record.owner != owner {
            record.owner = owner;
            self.events.push(RegistryEvent::Transfer { node, owner });
        }
    }

    fn write_resolver(&mut self, node: NodeId, resolver: Address) {
        let record = self.records.entry(node).or_default();
        if record.resolver != resolver {
            record.resolver = resolver;
            self.events.push(RegistryEvent::NewResolver { node, resolver });
        }
    }

    fn write_ttl(&mut self, node: NodeId, ttl: u64) {
        let record = self.records.entry(node).or_default();
        if record.ttl != ttl {
            record.ttl = ttl;
            self.events.push(RegistryEvent::NewTtl { node, ttl });
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::namehash::{label_hash, namehash};
    use std::collections::BTreeMap;

    /// Resolver that trusts the registry and current owners
    #[derive(Debug, Clone, Default)]
    pub(crate) struct MemoryResolver {
        pub values: BTreeMap<(NodeId, String), Bytes>,
    }

    impl Resolver for MemoryResolver {
        fn get_data(&self, node: &NodeId, key: &str) -> Option<Bytes> {
            self.values.get(&(*node, key.to_string())).cloned()
        }

        fn apply(&mut self, registry: &Registry, caller: Address, call: &ResolverCall) -> Result<()> {
            if caller != registry.address() && !registry.is_authorized(&call.node(), &caller) {
                return Err(CoreError::ResolverError("unauthorized".to_string()));
            }
            match call {
                ResolverCall::SetData { node, key, value } => {
                    self.values.insert((*node, key.clone()), value.clone());
                }
                ResolverCall::SetDataBatch { node, keys, values } => {
                    for (key, value) in keys.iter().zip(values) {
                        self.values.insert((*node, key.clone()), value.clone());
                    }
                }
                ResolverCall::ClearRecords { node } => {
                    self.values.retain(|(n, _), _| n != node);
                }
            }
            Ok(())
        }

        fn clone_box(&self) -> Box<dyn Resolver> {
            Box::new(self.clone())
        }
    }

    pub(crate) fn addr(id: u8) -> Address {
        Address::from([id; 20])
    }

    fn setup() -> (Registry, ResolverDirectory) {
        let registry = Registry::new(addr(0xee), addr(1), NameHasher::default());
        let mut resolvers = ResolverDirectory::new();
        resolvers.install(addr(0xaa), Box::new(MemoryResolver::default()));
        (registry, resolvers)
    }

    #[test]
    fn test_root_seeded_and_absent_records_zero() {
        let (registry, _) = setup();
        assert_eq!(registry.owner(&NodeId::ROOT), addr(1));
        let missing = namehash("nothing.here");
        assert_eq!(registry.get_record(&missing), NameRecord::default());
        assert!(!registry.record_exists(&missing));
    }

    #[test]
    fn test_sub_record_requires_parent_authorization() {
        let (mut registry, _) = setup();

        let err = registry
            .set_sub_record(addr(2), NodeId::ROOT, label_hash("id"), addr(2), Address::zero(), 0)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotAuthorized { .. }));

        let child = registry
            .set_sub_record(addr(1), NodeId::ROOT, label_hash("id"), addr(2), addr(0xaa), 300)
            .unwrap();
        assert_eq!(child, namehash("id"));
        assert_eq!(
            registry.get_record(&child),
            NameRecord { owner: addr(2), resolver: addr(0xaa), ttl: 300 }
        );
    }

    #[test]
    fn test_operator_follows_current_owner() {
        let (mut registry, _) = setup();
        let node = registry
            .set_subnode_owner(addr(1), NodeId::ROOT, label_hash("id"), addr(2))
            .unwrap();

        registry.set_approval_for_all(addr(2), addr(3), true);
        registry.set_ttl(addr(3), node, 60).unwrap();

        // Once the name moves, the old owner's operator loses authority
        registry.set_owner(addr(2), node, addr(4)).unwrap();
        assert!(registry.set_ttl(addr(3), node, 61).is_err());
        assert!(!registry.authorized_callers(&node).contains(&addr(3)));

        registry.set_approval_for_all(addr(2), addr(3), false);
        assert!(!registry.is_approved_for_all(&addr(2), &addr(3)));
    }

    #[test]
    fn test_null_owner_authorizes_nobody() {
        let (mut registry, _) = setup();
        let node = registry
            .set_subnode_owner(addr(1), NodeId::ROOT, label_hash("gone"), Address::zero())
            .unwrap();
        registry.set_approval_for_all(Address::zero(), addr(5), true);
        assert!(registry.set_owner(addr(5), node, addr(5)).is_err());
        assert!(registry.set_owner(Address::zero(), node, addr(5)).is_err());
    }

    #[test]
    fn test_reownership_keeps_resolver_and_ttl() {
        let (mut registry, _) = setup();
        let node = registry
            .set_sub_record(addr(1), NodeId::ROOT, label_hash("id"), addr(2), addr(0xaa), 300)
            .unwrap();
        registry.set_subnode_owner(addr(1), NodeId::ROOT, label_hash("id"), addr(3)).unwrap();
        let record = registry.get_record(&node);
        assert_eq!(record.owner, addr(3));
        assert_eq!(record.resolver, addr(0xaa));
        assert_eq!(record.ttl, 300);
    }

    #[test]
    fn test_changed_fields_raise_events() {
        let (mut registry, _) = setup();
        let node = namehash("id");
        registry
            .set_sub_record(addr(1), NodeId::ROOT, label_hash("id"), addr(2), Address::zero(), 0)
            .unwrap();
        registry.take_events();

        registry.set_record(addr(2), node, addr(2), addr(0xaa), 0).unwrap();
        assert_eq!(
            registry.take_events(),
            vec![RegistryEvent::NewResolver { node, resolver: addr(0xaa) }]
        );
    }

    #[test]
    fn test_resolver_data_forwarded_for_matching_node() {
        let (mut registry, mut resolvers) = setup();
        let child = namehash("id");
        let call = ResolverCall::SetData {
            node: child,
            key: "url".to_string(),
            value: Bytes::from_static(b"https://example.org"),
        };

        registry
            .set_sub_record_with_resolver_data(
                &mut resolvers,
                addr(1),
                NodeId::ROOT,
                label_hash("id"),
                addr(2),
                addr(0xaa),
                0,
                &[call.encode().unwrap()],
            )
            .unwrap();

        assert_eq!(
            resolvers.get_data(&addr(0xaa), &child, "url"),
            Some(Bytes::from_static(b"https://example.org"))
        );
    }

    #[test]
    fn test_resolver_data_for_other_node_rejected() {
        let (mut registry, mut resolvers) = setup();
        let victim = namehash("victim");
        let call = ResolverCall::ClearRecords { node: victim };

        let err = registry
            .set_sub_record_with_resolver_data(
                &mut resolvers,
                addr(1),
                NodeId::ROOT,
                label_hash("id"),
                addr(2),
                addr(0xaa),
                0,
                &[call.encode().unwrap()],
            )
            .unwrap_err();

        assert!(matches!(err, CoreError::ResolverNodeMismatch { found, .. } if found == victim));
        // Nothing was written
        assert_eq!(registry.owner(&namehash("id")), Address::zero());
    }

    #[test]
    fn test_resolver_data_requires_resolver() {
        let (mut registry, mut resolvers) = setup();
        let call = ResolverCall::ClearRecords { node: NodeId::ROOT };

        let err = registry
            .set_record_with_resolver_data(
                &mut resolvers,
                addr(1),
                NodeId::ROOT,
                addr(1),
                Address::zero(),
                0,
                &[call.encode().unwrap()],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::ResolverRequiredWhenDataSupplied));

        let err = registry
            .set_record_with_resolver_data(
                &mut resolvers,
                addr(1),
                NodeId::ROOT,
                addr(1),
                addr(0xbb),
                0,
                &[call.encode().unwrap()],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::ResolverNotFound(_)));
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let (mut registry, mut resolvers) = setup();
        let id = namehash("id");
        let calls = vec![
            RegistryCall::SetSubnodeOwner {
                parent: NodeId::ROOT,
                label: label_hash("id"),
                owner: addr(1),
            }
            .encode()
            .unwrap(),
            RegistryCall::SetTtl { node: id, ttl: 99 }.encode().unwrap(),
            // Caller does not own this one
            RegistryCall::SetOwner { node: namehash("x.y"), owner: addr(1) }.encode().unwrap(),
        ];

        let err = registry.execute_batch(&mut resolvers, addr(1), &calls).unwrap_err();
        assert!(matches!(err, CoreError::NotAuthorized { .. }));
        assert_eq!(registry.owner(&id), Address::zero());
        assert_eq!(registry.ttl(&id), 0);

        registry.execute_batch(&mut resolvers, addr(1), &calls[..2]).unwrap();
        assert_eq!(registry.owner(&id), addr(1));
        assert_eq!(registry.ttl(&id), 99);
    }

    #[test]
    fn test_batch_rejects_empty_and_garbage() {
        let (mut registry, mut resolvers) = setup();
        assert!(matches!(
            registry.execute_batch(&mut resolvers, addr(1), &[]),
            Err(CoreError::EmptyBatch)
        ));

        let calls = vec![
            RegistryCall::SetTtl { node: NodeId::ROOT, ttl: 5 }.encode().unwrap(),
            Bytes::from_static(&[0xff; 8]),
        ];
        assert!(matches!(
            registry.execute_batch(&mut resolvers, addr(1), &calls),
            Err(CoreError::BatchCallFailed(1))
        ));
        assert_eq!(registry.ttl(&NodeId::ROOT), 0);
    }
}
