//! Blinded registration commitments
//!
//! A commitment hides every parameter of a future registration behind a
//! domain-separated hash. Only the hash is published at commit time.

use std::collections::HashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::crypto::{secure_hash_multiple, HashAlgorithm};
use crate::error::{CoreError, Result};
use crate::types::{Address, Timestamp};

/// Domain tag of commitment hashes
pub const COMMITMENT_DOMAIN: &str = "LEASEDNAMES_COMMITMENT";

/// Parameters of a registration, as committed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Plaintext label to register
    pub name: String,

    /// Future holder
    pub owner: Address,

    /// Requested duration in seconds
    pub duration: u64,

    /// Blinding secret
    pub secret: [u8; 32],

    /// Resolver to point the name at; null for none
    pub resolver: Address,

    /// Address value to store in the resolver
    pub addr: Option<Address>,

    /// Whether to point the caller's reverse record at the name
    pub reverse_record: bool,
}

impl RegistrationRequest {
    /// Request without resolver configuration
    pub fn new(name: impl Into<String>, owner: Address, duration: u64, secret: [u8; 32]) -> Self {
        RegistrationRequest {
            name: name.into(),
            owner,
            duration,
            secret,
            resolver: Address::zero(),
            addr: None,
            reverse_record: false,
        }
    }

    /// Request with a freshly drawn secret
    pub fn with_random_secret(name: impl Into<String>, owner: Address, duration: u64) -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(name, owner, duration, secret)
    }

    /// Attach resolver configuration
    pub fn with_resolver(mut self, resolver: Address, addr: Option<Address>, reverse_record: bool) -> Self {
        self.resolver = resolver;
        self.addr = addr;
        self.reverse_record = reverse_record;
        self
    }

    /// Commitment hash of the request
    pub fn commitment(&self, algorithm: HashAlgorithm) -> Result<[u8; 32]> {
        if self.resolver.is_zero() && self.addr.is_some() {
            return Err(CoreError::ResolverRequiredWhenDataSupplied);
        }

        let duration = self.duration.to_be_bytes();
        let addr = self.addr.map(|a| a.to_fixed_bytes().to_vec()).unwrap_or_default();
        let reverse = [u8::from(self.reverse_record)];

        Ok(secure_hash_multiple(
            algorithm,
            COMMITMENT_DOMAIN,
            &[
                self.name.as_bytes(),
                self.owner.as_bytes(),
                &duration,
                self.resolver.as_bytes(),
                &addr,
                &self.secret,
                &reverse,
            ],
        ))
    }
}

/// Commit times by commitment hash
#[derive(Debug, Clone, Default)]
pub struct Commitments {
    entries: HashMap<[u8; 32], Timestamp>,
}

impl Commitments {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// When `commitment` was made
    pub fn committed_at(&self, commitment: &[u8; 32]) -> Option<Timestamp> {
        self.entries.get(commitment).copied()
    }

    /// Record `commitment` at `now` unless a live one exists
    ///
    /// A commitment stays live for as long as `check_age` could still
    /// accept it, including the second at which it is exactly `max_age` old.
    pub fn commit(&mut self, commitment: [u8; 32], now: Timestamp, max_age: u64) -> Result<()> {
        if let Some(at) = self.committed_at(&commitment) {
            if !Self::aged_out(at, now, max_age) {
                return Err(CoreError::UnexpiredCommitmentExists(hex::encode(commitment)));
            }
        }
        self.entries.insert(commitment, now);
        Ok(())
    }

    /// Check `commitment` is aged within `[min_age, max_age]` at `now`
    pub fn check_age(&self, commitment: &[u8; 32], now: Timestamp, min_age: u64, max_age: u64) -> Result<()> {
        let at = self
            .committed_at(commitment)
            .ok_or_else(|| CoreError::CommitmentNotFound(hex::encode(commitment)))?;
        if at.saturating_add(min_age) > now {
            return Err(CoreError::CommitmentTooNew(hex::encode(commitment)));
        }
        if Self::aged_out(at, now, max_age) {
            return Err(CoreError::CommitmentTooOld(hex::encode(commitment)));
        }
        Ok(())
    }

    /// Drop every commitment `check_age` can no longer accept; returns how many
    pub fn prune(&mut self, now: Timestamp, max_age: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, at| !Self::aged_out(*at, now, max_age));
        before - self.entries.len()
    }

    /// Number of stored commitments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no commitment is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn aged_out(at: Timestamp, now: Timestamp, max_age: u64) -> bool {
        at.saturating_add(max_age) < now
    }

    /// Remove a commitment; it cannot be used again
    pub fn consume(&mut self, commitment: &[u8; 32]) -> Option<Timestamp> {
        self.entries.remove(commitment)
    }
}
