//! # Leased Names Core
//!
//! Hierarchical name registry with time-limited, leased ownership.
//! This crate provides the three coupled components of the name service:
//!
//! * the namespace registry, mapping name identifiers to owner, resolver
//!   and TTL with hierarchical delegated authorization;
//! * the leasing registrar, issuing expiring ownership certificates for
//!   labels under one managed namespace;
//! * the commit-reveal controller, selling registrations and renewals.
//!
//! Resolvers, holder hooks, reverse registrars and price oracles are
//! collaborator traits; concrete implementations live in the periphery
//! crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod accounts;
pub mod config;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod events;
pub mod namehash;
pub mod registrar;
pub mod registry;
pub mod resolver;
pub mod reverse;
pub mod service;
pub mod state;
pub mod types;
pub mod utils;

/// Re-export common types for ease of use
pub use accounts::{AccountDirectory, CertificateNotice, GasMeter, HolderHooks, HookError};
pub use config::CoreConfig;
pub use controller::{Controller, Price, PriceOracle, RegistrationReceipt, RegistrationRequest};
pub use error::{CoreError, ErrorKind, Result};
pub use events::{Event, EventRecord};
pub use namehash::{label_hash, namehash, NameHasher};
pub use registrar::{Ledger, NameStatus, Registrar, UnregisterStep};
pub use registry::{NameRecord, Registry, RegistryCall};
pub use resolver::{Resolver, ResolverCall, ResolverDirectory};
pub use reverse::ReverseRegistrar;
pub use service::{create_name_service, NameService, SharedNameService};
pub use state::{Deployment, NamingState};
pub use types::{Address, LabelHash, NodeId, Timestamp, TxContext};

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
