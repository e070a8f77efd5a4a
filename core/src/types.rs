//! Shared identifier and context types

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};

/// Identity of a caller, holder or component
pub use ethers::types::Address;

/// Seconds on the shared ledger clock
pub type Timestamp = u64;

/// Fixed-size hash addressing a name in the registry
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 32]);

/// Hash of a single namespace label
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LabelHash(pub [u8; 32]);

impl NodeId {
    /// The reserved null identifier of the root record
    pub const ROOT: NodeId = NodeId([0u8; 32]);

    /// Raw bytes of the identifier
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the root identifier
    pub fn is_root(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl LabelHash {
    /// Raw bytes of the label hash
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "NodeId(0x{}..)", hex::encode(&self.0[0..4]))
    }
}

impl Display for LabelHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Debug for LabelHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "LabelHash(0x{}..)", hex::encode(&self.0[0..4]))
    }
}

/// Per-transaction execution context
///
/// Every state-changing operation runs against exactly one context: the
/// calling identity, the payment attached to the call and the ledger time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    /// Calling identity
    pub sender: Address,

    /// Payment attached to the call
    pub value: u128,

    /// Ledger time of the transaction
    pub now: Timestamp,
}

impl TxContext {
    /// Create a context without payment
    pub fn new(sender: Address, now: Timestamp) -> Self {
        TxContext { sender, value: 0, now }
    }

    /// Attach a payment
    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    /// Same clock, different caller. Used when one component calls another.
    pub fn as_caller(&self, sender: Address) -> Self {
        TxContext { sender, value: 0, now: self.now }
    }
}
