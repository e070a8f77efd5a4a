//! Reverse registrar collaborator interface
//!
//! A reverse registrar maps an address back to a name through a record
//! under `addr.reverse`. The controller only ever calls
//! [`ReverseRegistrar::claim_for_addr_with_resolver_data`].

use std::fmt::Debug;
use bytes::Bytes;

use crate::error::Result;
use crate::registry::Registry;
use crate::resolver::ResolverDirectory;
use crate::types::{Address, NodeId};

/// Owner of the reverse namespace
pub trait ReverseRegistrar: Debug + Send + Sync {
    /// Identity the reverse registrar acts as in the registry
    fn address(&self) -> Address;

    /// Claim the reverse record of `addr` for `owner` on behalf of
    /// `caller`, then forward `data` to `resolver`. Returns the reverse
    /// record's identifier.
    #[allow(clippy::too_many_arguments)]
    fn claim_for_addr_with_resolver_data(
        &mut self,
        registry: &mut Registry,
        resolvers: &mut ResolverDirectory,
        caller: Address,
        addr: Address,
        owner: Address,
        resolver: Address,
        data: &[Bytes],
    ) -> Result<NodeId>;

    /// Clone the reverse registrar
    fn clone_box(&self) -> Box<dyn ReverseRegistrar>;
}

impl Clone for Box<dyn ReverseRegistrar> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
