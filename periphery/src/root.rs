//! Root namespace administration
//!
//! Holds the registry root and hands out top-level labels on behalf of its
//! controllers. A locked label can never be reassigned through it again.

use std::collections::HashSet;
use log::info;

use leased_names_core::{Address, CoreError, LabelHash, NodeId, Registry};

use crate::error::{PeripheryError, Result};

/// Administrator of the root record
#[derive(Debug, Clone)]
pub struct RootAdmin {
    /// Identity that must own the registry root
    address: Address,

    /// Administrator
    owner: Address,

    /// Identities allowed to assign top-level labels
    controllers: HashSet<Address>,

    /// Labels frozen against reassignment
    locked: HashSet<LabelHash>,
}

impl RootAdmin {
    /// Create a root administrator
    pub fn new(address: Address, owner: Address) -> Self {
        RootAdmin {
            address,
            owner,
            controllers: HashSet::new(),
            locked: HashSet::new(),
        }
    }

    /// Identity of the administrator in the registry
    pub fn address(&self) -> Address {
        self.address
    }

    /// Allow or revoke a controller
    pub fn set_controller(&mut self, caller: Address, controller: Address, enabled: bool) -> Result<()> {
        self.only_owner(&caller)?;
        if enabled {
            self.controllers.insert(controller);
        } else {
            self.controllers.remove(&controller);
        }
        info!("Root controller {:?} enabled: {}", controller, enabled);
        Ok(())
    }

    /// Whether `controller` may assign labels
    pub fn is_controller(&self, controller: &Address) -> bool {
        self.controllers.contains(controller)
    }

    /// Assign the owner of a top-level label
    pub fn set_sub_name_owner(
        &mut self,
        registry: &mut Registry,
        caller: Address,
        label: LabelHash,
        owner: Address,
    ) -> Result<NodeId> {
        if !self.controllers.contains(&caller) {
            return Err(PeripheryError::NotRootController(caller));
        }
        if self.locked.contains(&label) {
            return Err(PeripheryError::Locked(label));
        }
        Ok(registry.set_subnode_owner(self.address, NodeId::ROOT, label, owner)?)
    }

    /// Freeze a top-level label
    pub fn lock(&mut self, caller: Address, label: LabelHash) -> Result<()> {
        self.only_owner(&caller)?;
        self.locked.insert(label);
        info!("Top-level label {} locked", label);
        Ok(())
    }

    /// Whether a top-level label is frozen
    pub fn is_locked(&self, label: &LabelHash) -> bool {
        self.locked.contains(label)
    }

    /// Set the resolver of the root record
    pub fn set_resolver(&mut self, registry: &mut Registry, caller: Address, resolver: Address) -> Result<()> {
        self.only_owner(&caller)?;
        Ok(registry.set_resolver(self.address, NodeId::ROOT, resolver)?)
    }

    fn only_owner(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(CoreError::CallerIsNotOwner(*caller).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leased_names_core::{label_hash, NameHasher};

    fn addr(n: u8) -> Address {
        Address::from([n; 20])
    }

    fn setup() -> (Registry, RootAdmin) {
        let root = RootAdmin::new(addr(0xf0), addr(1));
        let mut registry = Registry::new(addr(0xee), addr(1), NameHasher::default());
        registry.set_owner(addr(1), NodeId::ROOT, root.address()).unwrap();
        (registry, root)
    }

    #[test]
    fn test_controller_assigns_until_locked() {
        let (mut registry, mut root) = setup();
        let tld = label_hash("id");

        assert!(matches!(
            root.set_sub_name_owner(&mut registry, addr(2), tld, addr(2)),
            Err(PeripheryError::NotRootController(_))
        ));

        root.set_controller(addr(1), addr(2), true).unwrap();
        let node = root.set_sub_name_owner(&mut registry, addr(2), tld, addr(3)).unwrap();
        assert_eq!(registry.owner(&node), addr(3));

        root.lock(addr(1), tld).unwrap();
        assert!(root.is_locked(&tld));
        assert!(matches!(
            root.set_sub_name_owner(&mut registry, addr(2), tld, addr(4)),
            Err(PeripheryError::Locked(_))
        ));
        assert_eq!(registry.owner(&node), addr(3));
    }

    #[test]
    fn test_owner_only_operations() {
        let (mut registry, mut root) = setup();
        assert!(matches!(
            root.lock(addr(2), label_hash("id")),
            Err(PeripheryError::Core(CoreError::CallerIsNotOwner(_)))
        ));
        root.set_resolver(&mut registry, addr(1), addr(0xaa)).unwrap();
        assert_eq!(registry.resolver(&NodeId::ROOT), addr(0xaa));
    }
}
