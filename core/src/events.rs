//! Change notifications raised by the core components

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Address, LabelHash, NodeId, Timestamp};

/// Events raised by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A child record was assigned an owner under `parent`
    NewOwner { parent: NodeId, label: LabelHash, owner: Address },

    /// Owner of a record changed
    Transfer { node: NodeId, owner: Address },

    /// Resolver of a record changed
    NewResolver { node: NodeId, resolver: Address },

    /// TTL of a record changed
    NewTtl { node: NodeId, ttl: u64 },

    /// Operator approval toggled
    ApprovalForAll { owner: Address, operator: Address, approved: bool },
}

/// Events raised by the leasing registrar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrarEvent {
    /// Certificate issued
    NameRegistered { label: LabelHash, owner: Address, expires: Timestamp },

    /// Certificate expiry extended
    NameRenewed { label: LabelHash, expires: Timestamp },

    /// First unregister call recorded
    UnregisterRequested { label: LabelHash, at: Timestamp },

    /// Certificate burned by the second unregister call
    NameBurned { label: LabelHash, holder: Address, at: Timestamp },

    /// Certificate moved between holders
    Transfer { label: LabelHash, from: Address, to: Address },

    /// Single-certificate approval granted or cleared
    Approval { label: LabelHash, holder: Address, approved: Address },

    /// Holder-wide operator approval toggled
    ApprovalForAll { holder: Address, operator: Address, approved: bool },

    /// Controller added
    ControllerAdded { controller: Address },

    /// Controller removed
    ControllerRemoved { controller: Address },

    /// Burn notification ceiling changed
    MaxBurnGasChanged { value: u64 },

    /// Descriptor setter changed
    DescriptorSetterChanged { setter: Address },

    /// Certificate metadata entry set
    MetadataChanged { label: LabelHash, key: String },
}

/// Events raised by the commit-reveal controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerEvent {
    /// Commitment recorded
    CommitmentMade { commitment: [u8; 32], at: Timestamp },

    /// Name bought through commit-reveal
    NameRegistered {
        name: String,
        label: LabelHash,
        owner: Address,
        base_cost: u128,
        premium: u128,
        expires: Timestamp,
    },

    /// Name renewed through the controller
    NameRenewed { name: String, label: LabelHash, cost: u128, expires: Timestamp },

    /// Price oracle replaced
    PriceOracleChanged,

    /// Commitment age window changed
    CommitmentAgesChanged { min: u64, max: u64 },

    /// Accumulated payments swept to the owner
    Withdrawn { to: Address, amount: u128 },
}

/// Event from any component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Registry event
    Registry(RegistryEvent),

    /// Registrar event
    Registrar(RegistrarEvent),

    /// Controller event
    Controller(ControllerEvent),
}

/// Event of a committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Transaction that raised the event
    pub transaction: Uuid,

    /// Ledger time of the transaction
    pub at: Timestamp,

    /// The event
    pub event: Event,
}
