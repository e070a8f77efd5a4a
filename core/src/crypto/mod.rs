//! Cryptographic primitives for Leased Names
//!
//! This module provides the hash functions name identifiers, label hashes
//! and commitments are derived from.

mod hasher;

pub use hasher::{Blake2sHasher, HashAlgorithm, KeccakHasher, SecureHasher, Sha256Hasher};

use constant_time_eq::constant_time_eq;

/// Plain digest of `data` with the given algorithm
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> [u8; 32] {
    let mut hasher = algorithm.hasher();
    hasher.update(data);
    hasher.finalize()
}

/// Plain digest of the concatenation of `parts`
pub fn digest_concat(algorithm: HashAlgorithm, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = algorithm.hasher();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

/// Create a domain-separated secure hash of multiple inputs
///
/// # Arguments
///
/// * `algorithm` - Hash function to use
/// * `domain` - Domain prefix (e.g., "LEASEDNAMES_COMMITMENT")
/// * `data` - Elements to hash, each length-prefixed
///
/// # Returns
///
/// A 32-byte secure hash with domain separation
pub fn secure_hash_multiple(algorithm: HashAlgorithm, domain: &str, data: &[&[u8]]) -> [u8; 32] {
    algorithm.hasher().hash_multiple_with_domain(domain, data)
}

/// Verify a hash in constant time to prevent timing attacks
pub fn verify_hash(expected: &[u8; 32], actual: &[u8; 32]) -> bool {
    constant_time_eq(expected, actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_concat_matches_digest() {
        let joined = digest(HashAlgorithm::Keccak256, b"helloworld");
        let parts = digest_concat(HashAlgorithm::Keccak256, &[b"hello", b"world"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_secure_hash_multiple() {
        let data1 = b"data1";
        let data2 = b"data2";

        let hash = secure_hash_multiple(HashAlgorithm::Keccak256, "TEST", &[data1, data2]);
        assert_eq!(hash, secure_hash_multiple(HashAlgorithm::Keccak256, "TEST", &[data1, data2]));
        assert_ne!(hash, secure_hash_multiple(HashAlgorithm::Keccak256, "OTHER", &[data1, data2]));

        // Concatenation should not collide with the element list
        let concatenated = digest_concat(HashAlgorithm::Keccak256, &[data1, data2]);
        assert_ne!(hash, concatenated);
    }

    #[test]
    fn test_verify_hash() {
        let hash = digest(HashAlgorithm::Keccak256, b"test data");
        assert!(verify_hash(&hash, &hash));

        let different_hash = digest(HashAlgorithm::Keccak256, b"different data");
        assert!(!verify_hash(&hash, &different_hash));
    }
}
