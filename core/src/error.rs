//! Error types for the core crate
//!
//! This module provides a consolidated error type for the core crate.
//! Every failure is synchronous and non-retryable; [`CoreError::kind`]
//! groups the variants into the caller-facing taxonomy.

use std::io;
use thiserror::Error;

use crate::types::{Address, LabelHash, NodeId};

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks owner, operator, controller or admin rights
    Authorization,

    /// Name unavailable, already active, or past grace
    Availability,

    /// Commitment age, duration bounds or cool-down not met
    Timing,

    /// Malformed or mismatched input
    Consistency,

    /// Insufficient funds
    Payment,

    /// Configuration, IO, serialization or lock failures
    Internal,
}

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Caller is neither the owner of a record nor an operator of that owner
    #[error("Not authorized: {caller:?} on node {node}")]
    NotAuthorized { node: NodeId, caller: Address },

    /// Caller is not a registered controller of the registrar
    #[error("Caller is not a controller: {0:?}")]
    CallerIsNotController(Address),

    /// Caller is not the administrator of a component
    #[error("Caller is not the owner: {0:?}")]
    CallerIsNotOwner(Address),

    /// Caller is not allowed to set certificate metadata
    #[error("Not the descriptor setter: {0:?}")]
    NotDescriptorSetter(Address),

    /// Caller is neither holder nor approved for a certificate
    #[error("Caller {caller:?} is not holder or approved for label {label}")]
    NotApprovedOrHolder { label: LabelHash, caller: Address },

    /// Label cannot be registered right now
    #[error("Name not available: {0}")]
    NameNotAvailable(LabelHash),

    /// Certificate is past expiry (or has no holder)
    #[error("Name expired: {0}")]
    NameExpired(LabelHash),

    /// Certificate can no longer be renewed
    #[error("Renewal period ended: {0}")]
    RenewalPeriodEnded(LabelHash),

    /// Registrar no longer owns its managed namespace
    #[error("Registrar does not own its base node {0}")]
    RegistrarNotLive(NodeId),

    /// Second unregister call before the cool-down elapsed
    #[error("Cannot unregister {label} before {ready_at}")]
    CannotUnregisterYet { label: LabelHash, ready_at: u64 },

    /// No commitment recorded for the hash
    #[error("Commitment not found: {0}")]
    CommitmentNotFound(String),

    /// Commitment younger than the minimum age
    #[error("Commitment too new: {0}")]
    CommitmentTooNew(String),

    /// Commitment older than the maximum age
    #[error("Commitment too old: {0}")]
    CommitmentTooOld(String),

    /// A live commitment with the same hash already exists
    #[error("Unexpired commitment exists: {0}")]
    UnexpiredCommitmentExists(String),

    /// Registration duration below the minimum
    #[error("Duration too short: {duration} < {min}")]
    DurationTooShort { duration: u64, min: u64 },

    /// Registration duration at or above the maximum
    #[error("Duration too long: {duration} >= {max}")]
    DurationTooLong { duration: u64, max: u64 },

    /// Expiry arithmetic overflowed
    #[error("Duration overflow for label {0}")]
    DurationOverflow(LabelHash),

    /// Payment below the quoted price
    #[error("Insufficient value: required {required}, provided {provided}")]
    InsufficientValue { required: u128, provided: u128 },

    /// Resolver data supplied without a resolver
    #[error("Resolver required when data supplied")]
    ResolverRequiredWhenDataSupplied,

    /// Forwarded resolver call targets a different node than the record
    #[error("Resolver call node mismatch: expected {expected}, found {found}")]
    ResolverNodeMismatch { expected: NodeId, found: NodeId },

    /// No resolver is registered under the handle
    #[error("Resolver not found: {0:?}")]
    ResolverNotFound(Address),

    /// Resolver refused a forwarded call
    #[error("Resolver error: {0}")]
    ResolverError(String),

    /// Opaque call payload could not be decoded
    #[error("Malformed call: {0}")]
    MalformedCall(String),

    /// Batch was empty
    #[error("Empty batch")]
    EmptyBatch,

    /// Batch entry could not be executed
    #[error("Batch call failed at index {0}")]
    BatchCallFailed(usize),

    /// Supplied label does not hash to the certificate's label hash
    #[error("Label hash is not valid: {0}")]
    LabelHashIsNotValid(LabelHash),

    /// Certificate transfer source does not match the holder
    #[error("Transfer of {label} from incorrect holder {from:?}")]
    TransferFromIncorrectHolder { label: LabelHash, from: Address },

    /// Certificate transfer to the null identity
    #[error("Transfer of {0} to the null identity")]
    TransferToNullIdentity(LabelHash),

    /// Recipient hooks refused a certificate
    #[error("Receiver {receiver:?} rejected certificate: {reason}")]
    ReceiverRejected { receiver: Address, reason: String },

    /// Invalid commitment age window
    #[error("Invalid commitment ages: min {min}, max {max}")]
    InvalidCommitmentAges { min: u64, max: u64 },

    /// Reverse record requested but no reverse registrar is installed
    #[error("Reverse registrar not configured")]
    ReverseRegistrarNotSet,

    /// Name failed validation
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Bincode error
    #[error("Bincode error: {0}")]
    BincodeError(#[from] bincode::Error),

    /// Hex decoding error
    #[error("Hex decoding error: {0}")]
    HexError(#[from] hex::FromHexError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// State management error
    #[error("State management error: {0}")]
    StateError(String),
}

impl CoreError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        use CoreError::*;
        match self {
            NotAuthorized { .. }
            | CallerIsNotController(_)
            | CallerIsNotOwner(_)
            | NotDescriptorSetter(_)
            | NotApprovedOrHolder { .. } => ErrorKind::Authorization,

            NameNotAvailable(_)
            | NameExpired(_)
            | RenewalPeriodEnded(_)
            | RegistrarNotLive(_) => ErrorKind::Availability,

            CannotUnregisterYet { .. }
            | CommitmentNotFound(_)
            | CommitmentTooNew(_)
            | CommitmentTooOld(_)
            | UnexpiredCommitmentExists(_)
            | DurationTooShort { .. }
            | DurationTooLong { .. } => ErrorKind::Timing,

            InsufficientValue { .. } => ErrorKind::Payment,

            DurationOverflow(_)
            | ResolverRequiredWhenDataSupplied
            | ResolverNodeMismatch { .. }
            | ResolverNotFound(_)
            | ResolverError(_)
            | MalformedCall(_)
            | EmptyBatch
            | BatchCallFailed(_)
            | LabelHashIsNotValid(_)
            | TransferFromIncorrectHolder { .. }
            | TransferToNullIdentity(_)
            | ReceiverRejected { .. }
            | InvalidCommitmentAges { .. }
            | ReverseRegistrarNotSet
            | InvalidName(_) => ErrorKind::Consistency,

            IoError(_) | JsonError(_) | BincodeError(_) | HexError(_) | ConfigError(_)
            | StateError(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

/// Convert a string error to a StateError
pub fn to_state_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::StateError(err.to_string())
}

/// Convert a string error to a ConfigError
pub fn to_config_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::ConfigError(err.to_string())
}

/// Convert a string error to a ResolverError
pub fn to_resolver_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::ResolverError(err.to_string())
}
