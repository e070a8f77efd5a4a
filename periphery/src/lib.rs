//! # Leased Names Periphery
//!
//! Concrete collaborators for the core name service: a versioned public
//! resolver, the reverse registrar, the root administrator and price
//! oracles, plus a standard deployment wiring them together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod deploy;
pub mod error;
pub mod oracle;
pub mod resolver;
pub mod reverse;
pub mod root;

pub use deploy::{deploy_standard, StandardDeployment};
pub use error::{PeripheryError, Result};
pub use oracle::{ExponentialPremiumOracle, FixedPriceOracle};
pub use resolver::VersionedResolver;
pub use reverse::StandardReverseRegistrar;
pub use root::RootAdmin;
