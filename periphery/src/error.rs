//! Error types for the periphery crate

use std::io;
use thiserror::Error;

use leased_names_core::{Address, CoreError, LabelHash};

/// Periphery error type
#[derive(Error, Debug)]
pub enum PeripheryError {
    /// Failure inside a core component
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Top-level label is locked against reassignment
    #[error("Label {0} is locked")]
    Locked(LabelHash),

    /// Caller is not a controller of the root administrator
    #[error("Caller is not a root controller: {0:?}")]
    NotRootController(Address),

    /// Price table is unusable
    #[error("Invalid price table: {0}")]
    InvalidPriceTable(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for the periphery crate
pub type Result<T> = std::result::Result<T, PeripheryError>;
