//! Encoded registry self-calls for batching

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{Address, LabelHash, NodeId};

/// One registry operation, executed in the batch caller's context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryCall {
    /// `set_record`
    SetRecord { node: NodeId, owner: Address, resolver: Address, ttl: u64 },

    /// `set_sub_record`
    SetSubRecord { parent: NodeId, label: LabelHash, owner: Address, resolver: Address, ttl: u64 },

    /// `set_subnode_owner`
    SetSubnodeOwner { parent: NodeId, label: LabelHash, owner: Address },

    /// `set_owner`
    SetOwner { node: NodeId, owner: Address },

    /// `set_resolver`
    SetResolver { node: NodeId, resolver: Address },

    /// `set_ttl`
    SetTtl { node: NodeId, ttl: u64 },

    /// `set_approval_for_all`
    SetApprovalForAll { operator: Address, approved: bool },

    /// `set_record_with_resolver_data`
    SetRecordWithResolverData {
        node: NodeId,
        owner: Address,
        resolver: Address,
        ttl: u64,
        data: Vec<Bytes>,
    },

    /// `set_sub_record_with_resolver_data`
    SetSubRecordWithResolverData {
        parent: NodeId,
        label: LabelHash,
        owner: Address,
        resolver: Address,
        ttl: u64,
        data: Vec<Bytes>,
    },
}

impl RegistryCall {
    /// Opaque wire form of the call
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    /// Decode an opaque call
    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| CoreError::MalformedCall(e.to_string()))
    }
}
