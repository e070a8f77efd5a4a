//! Resolver collaborator interface
//!
//! Resolvers are record-value stores addressed by a handle held in each
//! registry record. The core never interprets resolver data; it only
//! forwards encoded [`ResolverCall`]s and checks which node they target.

use std::collections::HashMap;
use std::fmt::Debug;
use bytes::Bytes;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::registry::Registry;
use crate::types::{Address, NodeId};

/// Key under which an address value is stored
pub const ADDR_KEY: &str = "addr";

/// Key under which a reverse record stores its name
pub const NAME_KEY: &str = "name";

/// A state-changing call forwarded to a resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolverCall {
    /// Set one value
    SetData { node: NodeId, key: String, value: Bytes },

    /// Set several values; keys and values pair up by position
    SetDataBatch { node: NodeId, keys: Vec<String>, values: Vec<Bytes> },

    /// Make every value of the node unreadable
    ClearRecords { node: NodeId },
}

impl ResolverCall {
    /// The name identifier the call targets
    pub fn node(&self) -> NodeId {
        match self {
            ResolverCall::SetData { node, .. }
            | ResolverCall::SetDataBatch { node, .. }
            | ResolverCall::ClearRecords { node } => *node,
        }
    }

    /// Opaque wire form of the call
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    /// Decode an opaque call
    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| CoreError::MalformedCall(e.to_string()))
    }
}

/// Record-value store
pub trait Resolver: Debug + Send + Sync {
    /// Read a value of a node
    fn get_data(&self, node: &NodeId, key: &str) -> Option<Bytes>;

    /// Read several values of a node
    fn get_data_batch(&self, node: &NodeId, keys: &[String]) -> Vec<Option<Bytes>> {
        keys.iter().map(|key| self.get_data(node, key)).collect()
    }

    /// Apply a call on behalf of `caller`
    ///
    /// Implementations authorize against the current registry ownership of
    /// the call's node.
    fn apply(&mut self, registry: &Registry, caller: Address, call: &ResolverCall) -> Result<()>;

    /// Clone the resolver
    fn clone_box(&self) -> Box<dyn Resolver>;
}

impl Clone for Box<dyn Resolver> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Resolvers reachable by handle
#[derive(Debug, Clone, Default)]
pub struct ResolverDirectory {
    resolvers: HashMap<Address, Box<dyn Resolver>>,
}

impl ResolverDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a resolver reachable under `handle`, replacing any previous one
    pub fn install(&mut self, handle: Address, resolver: Box<dyn Resolver>) {
        debug!("Installing resolver at {:?}", handle);
        self.resolvers.insert(handle, resolver);
    }

    /// Resolver under `handle`
    pub fn get(&self, handle: &Address) -> Option<&dyn Resolver> {
        self.resolvers.get(handle).map(|r| r.as_ref())
    }

    /// Whether a resolver is installed under `handle`
    pub fn contains(&self, handle: &Address) -> bool {
        self.resolvers.contains_key(handle)
    }

    /// Read a value through the resolver under `handle`
    pub fn get_data(&self, handle: &Address, node: &NodeId, key: &str) -> Option<Bytes> {
        self.get(handle).and_then(|r| r.get_data(node, key))
    }

    /// Forward a call to the resolver under `handle`
    pub fn forward(
        &mut self,
        registry: &Registry,
        caller: Address,
        handle: &Address,
        call: &ResolverCall,
    ) -> Result<()> {
        let resolver = self
            .resolvers
            .get_mut(handle)
            .ok_or(CoreError::ResolverNotFound(*handle))?;
        resolver.apply(registry, caller, call)
    }
}
