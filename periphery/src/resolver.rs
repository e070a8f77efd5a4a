//! Versioned key-value resolver
//!
//! Values are stored per `(node, version, key)`. Clearing a node's records
//! bumps its version, which makes every earlier value unreadable without
//! touching the stored entries.

use std::collections::{HashMap, HashSet};
use bytes::Bytes;
use log::debug;

use leased_names_core::{Address, CoreError, NodeId, Registry, Resolver, ResolverCall, Result};

/// Resolver keyed by record version
#[derive(Debug, Clone, Default)]
pub struct VersionedResolver {
    /// Callers allowed on every node, e.g. the controller
    trusted: HashSet<Address>,

    /// Current version per node
    versions: HashMap<NodeId, u64>,

    /// (node, version, key) -> value
    values: HashMap<(NodeId, u64, String), Bytes>,
}

impl VersionedResolver {
    /// Create a resolver trusting `trusted` on every node
    pub fn new(trusted: impl IntoIterator<Item = Address>) -> Self {
        VersionedResolver {
            trusted: trusted.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Current version of `node`
    pub fn version(&self, node: &NodeId) -> u64 {
        self.versions.get(node).copied().unwrap_or(0)
    }

    /// Whether `caller` may write `node`
    ///
    /// The registry itself is trusted: it only forwards calls it has
    /// authorized and matched against the record being written.
    pub fn is_authorized(&self, registry: &Registry, node: &NodeId, caller: &Address) -> bool {
        *caller == registry.address() || self.trusted.contains(caller) || registry.is_authorized(node, caller)
    }

    /// Set one value
    pub fn set_data(&mut self, registry: &Registry, caller: Address, node: NodeId, key: &str, value: Bytes) -> Result<()> {
        self.authorize(registry, &node, &caller)?;
        self.write(node, key, value);
        Ok(())
    }

    /// Set several values; `keys` and `values` pair up by position
    pub fn set_data_batch(
        &mut self,
        registry: &Registry,
        caller: Address,
        node: NodeId,
        keys: &[String],
        values: &[Bytes],
    ) -> Result<()> {
        self.authorize(registry, &node, &caller)?;
        if keys.len() != values.len() {
            return Err(CoreError::MalformedCall(format!(
                "{} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        for (key, value) in keys.iter().zip(values) {
            self.write(node, key, value.clone());
        }
        Ok(())
    }

    /// Make every value of `node` unreadable
    pub fn clear_records(&mut self, registry: &Registry, caller: Address, node: NodeId) -> Result<()> {
        self.authorize(registry, &node, &caller)?;
        let version = self.versions.entry(node).or_insert(0);
        *version += 1;
        debug!("Cleared records of {}, now version {}", node, version);
        Ok(())
    }

    fn authorize(&self, registry: &Registry, node: &NodeId, caller: &Address) -> Result<()> {
        if self.is_authorized(registry, node, caller) {
            Ok(())
        } else {
            Err(CoreError::ResolverError(format!("{:?} may not write {}", caller, node)))
        }
    }

    fn write(&mut self, node: NodeId, key: &str, value: Bytes) {
        let version = self.version(&node);
        self.values.insert((node, version, key.to_string()), value);
    }
}

impl Resolver for VersionedResolver {
    fn get_data(&self, node: &NodeId, key: &str) -> Option<Bytes> {
        self.values
            .get(&(*node, self.version(node), key.to_string()))
            .cloned()
    }

    fn apply(&mut self, registry: &Registry, caller: Address, call: &ResolverCall) -> Result<()> {
        match call {
            ResolverCall::SetData { node, key, value } => self.set_data(registry, caller, *node, key, value.clone()),
            ResolverCall::SetDataBatch { node, keys, values } => {
                self.set_data_batch(registry, caller, *node, keys, values)
            }
            ResolverCall::ClearRecords { node } => self.clear_records(registry, caller, *node),
        }
    }

    fn clone_box(&self) -> Box<dyn Resolver> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leased_names_core::{label_hash, NameHasher};

    fn addr(n: u8) -> Address {
        Address::from([n; 20])
    }

    fn registry_with_name() -> (Registry, NodeId) {
        let mut registry = Registry::new(addr(0xee), addr(1), NameHasher::default());
        let node = registry
            .set_subnode_owner(addr(1), NodeId::ROOT, label_hash("name"), addr(2))
            .unwrap();
        (registry, node)
    }

    #[test]
    fn test_owner_writes_and_clear_hides_old_values() {
        let (registry, node) = registry_with_name();
        let mut resolver = VersionedResolver::default();

        resolver.set_data(&registry, addr(2), node, "url", Bytes::from_static(b"a")).unwrap();
        assert_eq!(resolver.get_data(&node, "url"), Some(Bytes::from_static(b"a")));

        resolver.clear_records(&registry, addr(2), node).unwrap();
        assert_eq!(resolver.version(&node), 1);
        assert_eq!(resolver.get_data(&node, "url"), None);

        resolver.set_data(&registry, addr(2), node, "url", Bytes::from_static(b"b")).unwrap();
        assert_eq!(
            resolver.get_data_batch(&node, &["url".to_string(), "x".to_string()]),
            vec![Some(Bytes::from_static(b"b")), None]
        );
    }

    #[test]
    fn test_authorization() {
        let (registry, node) = registry_with_name();
        let mut resolver = VersionedResolver::new([addr(7)]);

        assert!(matches!(
            resolver.set_data(&registry, addr(3), node, "k", Bytes::new()),
            Err(CoreError::ResolverError(_))
        ));
        resolver.set_data(&registry, addr(7), node, "k", Bytes::new()).unwrap();
        resolver.set_data(&registry, registry.address(), node, "k", Bytes::new()).unwrap();
    }

    #[test]
    fn test_batch_length_mismatch() {
        let (registry, node) = registry_with_name();
        let mut resolver = VersionedResolver::default();
        let err = resolver
            .set_data_batch(&registry, addr(2), node, &["a".to_string()], &[])
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedCall(_)));
    }
}
