//! Reverse registrar for `addr.reverse`
//!
//! Each address owns the record `<hex address>.addr.reverse`, whose
//! resolver holds the address's primary name. The identifier derivation is
//! shared with the controller through [`NameHasher::reverse_node`].

use std::collections::HashSet;
use bytes::Bytes;
use log::{debug, info};

use leased_names_core::resolver::NAME_KEY;
use leased_names_core::{
    Address, CoreError, NameHasher, NodeId, Registry, ResolverCall, ResolverDirectory, Result, ReverseRegistrar,
};

/// Owner of the `addr.reverse` namespace
#[derive(Debug, Clone)]
pub struct StandardReverseRegistrar {
    /// Identity the registrar acts as in the registry
    address: Address,

    /// Administrator
    owner: Address,

    /// Identities allowed to claim on behalf of any address
    controllers: HashSet<Address>,

    /// Resolver used by `claim` and `set_name`
    default_resolver: Address,
}

impl StandardReverseRegistrar {
    /// Create a reverse registrar
    pub fn new(address: Address, owner: Address, default_resolver: Address) -> Self {
        StandardReverseRegistrar {
            address,
            owner,
            controllers: HashSet::new(),
            default_resolver,
        }
    }

    /// Resolver used by `claim` and `set_name`
    pub fn default_resolver(&self) -> Address {
        self.default_resolver
    }

    /// Whether `controller` may claim for any address
    pub fn is_controller(&self, controller: &Address) -> bool {
        self.controllers.contains(controller)
    }

    /// Allow or revoke a controller
    pub fn set_controller(&mut self, caller: Address, controller: Address, enabled: bool) -> Result<()> {
        self.only_owner(&caller)?;
        if enabled {
            self.controllers.insert(controller);
        } else {
            self.controllers.remove(&controller);
        }
        info!("Reverse controller {:?} enabled: {}", controller, enabled);
        Ok(())
    }

    /// Change the default resolver
    pub fn set_default_resolver(&mut self, caller: Address, resolver: Address) -> Result<()> {
        self.only_owner(&caller)?;
        self.default_resolver = resolver;
        Ok(())
    }

    /// Claim the caller's own reverse record for `owner`
    pub fn claim(
        &mut self,
        registry: &mut Registry,
        resolvers: &mut ResolverDirectory,
        caller: Address,
        owner: Address,
    ) -> Result<NodeId> {
        let resolver = self.default_resolver;
        self.claim_for_addr_with_resolver_data(registry, resolvers, caller, caller, owner, resolver, &[])
    }

    /// Point the caller's reverse record at `name`
    pub fn set_name(
        &mut self,
        registry: &mut Registry,
        resolvers: &mut ResolverDirectory,
        caller: Address,
        name: &str,
    ) -> Result<NodeId> {
        let data = ResolverCall::SetData {
            node: registry.hasher().reverse_node(&caller),
            key: NAME_KEY.to_string(),
            value: Bytes::copy_from_slice(name.as_bytes()),
        };
        let resolver = self.default_resolver;
        self.claim_for_addr_with_resolver_data(registry, resolvers, caller, caller, caller, resolver, &[data.encode()?])
    }

    /// Identifier of the reverse record of `addr`
    pub fn node(&self, hasher: &NameHasher, addr: &Address) -> NodeId {
        hasher.reverse_node(addr)
    }

    fn authorize(&self, registry: &Registry, caller: &Address, addr: &Address) -> Result<()> {
        let node = registry.hasher().reverse_node(addr);
        if caller == addr
            || self.controllers.contains(caller)
            || registry.is_approved_for_all(addr, caller)
            || registry.is_authorized(&node, caller)
        {
            Ok(())
        } else {
            Err(CoreError::NotAuthorized { node, caller: *caller })
        }
    }

    fn only_owner(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(CoreError::CallerIsNotOwner(*caller))
        }
    }
}

impl ReverseRegistrar for StandardReverseRegistrar {
    fn address(&self) -> Address {
        self.address
    }

    fn claim_for_addr_with_resolver_data(
        &mut self,
        registry: &mut Registry,
        resolvers: &mut ResolverDirectory,
        caller: Address,
        addr: Address,
        owner: Address,
        resolver: Address,
        data: &[Bytes],
    ) -> Result<NodeId> {
        self.authorize(registry, &caller, &addr)?;

        let hasher = *registry.hasher();
        let parent = hasher.addr_reverse_node();
        let label = hasher.address_label_hash(&addr);
        let node = registry.set_sub_record_with_resolver_data(
            resolvers,
            self.address,
            parent,
            label,
            owner,
            resolver,
            0,
            data,
        )?;

        debug!("Reverse record of {:?} claimed for {:?}", addr, owner);
        Ok(node)
    }

    fn clone_box(&self) -> Box<dyn ReverseRegistrar> {
        Box::new(self.clone())
    }
}
