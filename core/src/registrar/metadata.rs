//! Per-certificate descriptive metadata

use std::collections::{BTreeMap, HashMap};

use crate::types::LabelHash;

/// Reserved key holding the plaintext label of a certificate
pub const NAME_LABEL_KEY: &str = "name-label";

/// Key/value metadata attached to certificates
#[derive(Debug, Clone, Default)]
pub struct CertificateMetadata {
    entries: HashMap<LabelHash, BTreeMap<String, String>>,
}

impl CertificateMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one entry
    pub fn set(&mut self, label: LabelHash, key: &str, value: &str) {
        self.entries
            .entry(label)
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Read one entry
    pub fn get(&self, label: &LabelHash, key: &str) -> Option<&str> {
        self.entries
            .get(label)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Plaintext label, if someone proved it
    pub fn name_label(&self, label: &LabelHash) -> Option<&str> {
        self.get(label, NAME_LABEL_KEY)
    }

    /// Human-readable descriptor: `<label>.<base name>` when the label is
    /// known, the hex label hash otherwise
    pub fn descriptor(&self, label: &LabelHash, base_name: &str) -> String {
        match self.name_label(label) {
            Some(name) => format!("{}.{}", name, base_name),
            None => format!("{}.{}", label, base_name),
        }
    }
}
