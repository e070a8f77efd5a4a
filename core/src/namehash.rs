//! Name hashing
//!
//! Derives the fixed-size identifiers every other component addresses
//! records by. A child identifier is `H(parent ‖ H(label))`; a dotted name
//! is folded from the root (null identifier) over its labels right to left.
//!
//! The reverse namespace helpers live here as well: the controller and the
//! reverse registrar must derive identical reverse identifiers for an
//! address, so both use [`NameHasher::reverse_node`].

use crate::crypto::{self, HashAlgorithm};
use crate::types::{Address, LabelHash, NodeId};

/// Lookup table for rendering address nibbles
const HEX_TABLE: &[u8; 16] = b"0123456789abcdef";

/// Label of the reverse namespace top level
pub const REVERSE_TLD: &str = "reverse";

/// Label of the address reverse namespace under [`REVERSE_TLD`]
pub const ADDR_REVERSE_LABEL: &str = "addr";

/// Derives label hashes and name identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameHasher {
    algorithm: HashAlgorithm,
}

impl NameHasher {
    /// Create a hasher for the given algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        NameHasher { algorithm }
    }

    /// The configured algorithm
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash a single label
    pub fn label_hash(&self, label: &str) -> LabelHash {
        LabelHash(crypto::digest(self.algorithm, label.as_bytes()))
    }

    /// Identifier of `label_hash` under `parent`
    pub fn child_node(&self, parent: &NodeId, label_hash: &LabelHash) -> NodeId {
        NodeId(crypto::digest_concat(
            self.algorithm,
            &[parent.as_bytes(), label_hash.as_bytes()],
        ))
    }

    /// Identifier of a dotted name; the empty name is the root
    pub fn namehash(&self, name: &str) -> NodeId {
        if name.is_empty() {
            return NodeId::ROOT;
        }

        name.rsplit('.').fold(NodeId::ROOT, |node, label| {
            self.child_node(&node, &self.label_hash(label))
        })
    }

    /// Identifier of `addr.reverse`
    pub fn addr_reverse_node(&self) -> NodeId {
        let reverse = self.child_node(&NodeId::ROOT, &self.label_hash(REVERSE_TLD));
        self.child_node(&reverse, &self.label_hash(ADDR_REVERSE_LABEL))
    }

    /// Label hash of an address under `addr.reverse`
    pub fn address_label_hash(&self, addr: &Address) -> LabelHash {
        self.label_hash(&hex_address_label(addr))
    }

    /// Identifier of the reverse record for an address
    pub fn reverse_node(&self, addr: &Address) -> NodeId {
        self.child_node(&self.addr_reverse_node(), &self.address_label_hash(addr))
    }
}

/// Lowercase 40 character hex label of an address, without prefix
pub fn hex_address_label(addr: &Address) -> String {
    let mut out = Vec::with_capacity(40);
    for byte in addr.as_bytes() {
        out.push(HEX_TABLE[(byte >> 4) as usize]);
        out.push(HEX_TABLE[(byte & 0x0f) as usize]);
    }
    // The table only yields ASCII
    out.into_iter().map(char::from).collect()
}

/// Keccak-based label hash, the default addressing scheme
pub fn label_hash(label: &str) -> LabelHash {
    NameHasher::default().label_hash(label)
}

/// Keccak-based child identifier
pub fn child_node(parent: &NodeId, label_hash: &LabelHash) -> NodeId {
    NameHasher::default().child_node(parent, label_hash)
}

/// Keccak-based identifier of a dotted name
pub fn namehash(name: &str) -> NodeId {
    NameHasher::default().namehash(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_namehash_vectors() {
        assert_eq!(namehash(""), NodeId::ROOT);
        assert_eq!(
            namehash("eth").to_string(),
            "0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
        assert_eq!(
            namehash("foo.eth").to_string(),
            "0xde9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn test_namehash_is_fold_of_child_node() {
        let base = namehash("id");
        let alice = child_node(&base, &label_hash("alice"));
        assert_eq!(alice, namehash("alice.id"));
    }

    #[test]
    fn test_hex_address_label() {
        let addr = Address::from([0xab; 20]);
        assert_eq!(hex_address_label(&addr), "ab".repeat(20));
        assert_eq!(hex_address_label(&Address::zero()), "0".repeat(40));
        assert_eq!(hex_address_label(&addr), hex::encode(addr.as_bytes()));
    }

    #[test]
    fn test_reverse_node() {
        let hasher = NameHasher::default();
        let addr = Address::from([0x12; 20]);
        let expected = namehash(&format!("{}.addr.reverse", hex_address_label(&addr)));
        assert_eq!(hasher.reverse_node(&addr), expected);
        assert_eq!(hasher.addr_reverse_node(), namehash("addr.reverse"));
    }

    #[test]
    fn test_algorithm_changes_identifiers() {
        let keccak = NameHasher::new(HashAlgorithm::Keccak256);
        let sha = NameHasher::new(HashAlgorithm::Sha256);
        assert_ne!(keccak.namehash("alice.id"), sha.namehash("alice.id"));
        assert_eq!(sha.namehash(""), NodeId::ROOT);
    }

    proptest! {
        #[test]
        fn prop_distinct_parents_never_collide(a in any::<[u8; 32]>(), b in any::<[u8; 32]>(), label in "[a-z]{1,12}") {
            prop_assume!(a != b);
            let hash = label_hash(&label);
            prop_assert_ne!(child_node(&NodeId(a), &hash), child_node(&NodeId(b), &hash));
        }

        #[test]
        fn prop_child_is_deterministic(parent in any::<[u8; 32]>(), label in "[a-z0-9]{1,16}") {
            let hash = label_hash(&label);
            prop_assert_eq!(child_node(&NodeId(parent), &hash), child_node(&NodeId(parent), &hash));
        }
    }
}
