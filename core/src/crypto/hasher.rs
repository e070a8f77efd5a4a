//! Secure hasher implementations
//!
//! This module provides a trait for the hash functions the naming scheme
//! can be built on, and concrete implementations using Keccak-256,
//! SHA-256 and Blake2s.

use blake2::Blake2s256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use std::fmt::Debug;

/// Hash algorithm backing name identifiers and commitments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// Keccak-256
    Keccak256,

    /// SHA-256
    Sha256,

    /// Blake2s
    Blake2s,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Keccak256
    }
}

impl HashAlgorithm {
    /// Create a fresh hasher for this algorithm
    pub fn hasher(&self) -> Box<dyn SecureHasher> {
        match self {
            HashAlgorithm::Keccak256 => Box::new(KeccakHasher::new()),
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher::new()),
            HashAlgorithm::Blake2s => Box::new(Blake2sHasher::new()),
        }
    }
}

/// SecureHasher trait for incremental and domain-separated hashing
pub trait SecureHasher: Debug + Send + Sync + 'static {
    /// Update the hasher with new data
    fn update(&mut self, data: &[u8]);

    /// Finalize the hash, returning the digest and resetting the hasher
    fn finalize(&mut self) -> [u8; 32];

    /// Hash data with domain separation
    fn hash_with_domain(&mut self, domain: &str, data: &[u8]) -> [u8; 32] {
        self.update(domain.as_bytes());
        self.update(&[domain.len() as u8]);
        self.update(data);
        self.finalize()
    }

    /// Hash multiple data elements with domain separation
    ///
    /// Each element is length-prefixed so that no two distinct element
    /// lists share an encoding.
    fn hash_multiple_with_domain(&mut self, domain: &str, data: &[&[u8]]) -> [u8; 32] {
        self.update(domain.as_bytes());
        self.update(&[domain.len() as u8]);
        self.update(&[data.len() as u8]);

        for element in data {
            self.update(&(element.len() as u32).to_be_bytes());
            self.update(element);
        }

        self.finalize()
    }
}

macro_rules! digest_hasher {
    ($(#[$doc:meta])* $name:ident, $inner:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            inner: $inner,
        }

        impl $name {
            /// Create a new hasher
            pub fn new() -> Self {
                $name { inner: <$inner>::new() }
            }
        }

        impl SecureHasher for $name {
            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.inner, data);
            }

            fn finalize(&mut self) -> [u8; 32] {
                let result = self.inner.finalize_reset();
                let mut output = [0u8; 32];
                output.copy_from_slice(&result);
                output
            }
        }
    };
}

digest_hasher!(
    /// Keccak-256 implementation of SecureHasher
    KeccakHasher,
    Keccak256
);

digest_hasher!(
    /// SHA-256 implementation of SecureHasher
    Sha256Hasher,
    Sha256
);

digest_hasher!(
    /// Blake2s implementation of SecureHasher
    Blake2sHasher,
    Blake2s256
);
