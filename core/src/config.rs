//! Configuration for the core crate
//!
//! This module provides configuration options for hashing, the leasing
//! registrar and the commit-reveal controller.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::crypto::HashAlgorithm;
use crate::error::{CoreError, Result};

const DAY: u64 = 24 * 60 * 60;

/// Hashing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Hash algorithm for name identifiers and commitments
    pub algorithm: HashAlgorithm,
}

/// Leasing registrar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrarConfig {
    /// Label of the managed namespace under the root (e.g. "id")
    pub base_name: String,

    /// Window after expiry during which the label stays reserved
    pub grace_period: Duration,

    /// Minimum age of a pending unregister before the burn completes
    pub unregister_cooldown: Duration,

    /// Initial gas ceiling for holder notifications on destruction
    pub max_burn_gas: u64,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        RegistrarConfig {
            base_name: "id".to_string(),
            grace_period: Duration::from_secs(90 * DAY),
            unregister_cooldown: Duration::from_secs(DAY),
            max_burn_gas: 100_000,
        }
    }
}

/// Commit-reveal controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Minimum age before a commitment can be consumed
    pub min_commitment_age: Duration,

    /// Maximum age at which a commitment can still be consumed
    pub max_commitment_age: Duration,

    /// Shortest registration accepted
    pub min_registration_duration: Duration,

    /// Registrations must be strictly shorter than this
    pub max_registration_duration: Duration,

    /// Minimum number of characters in a registrable label
    pub min_name_length: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            min_commitment_age: Duration::from_secs(60),
            max_commitment_age: Duration::from_secs(DAY),
            min_registration_duration: Duration::from_secs(28 * DAY),
            max_registration_duration: Duration::from_secs(100 * 365 * DAY),
            min_name_length: 3,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Hashing configuration
    pub hashing: HashingConfig,

    /// Registrar configuration
    pub registrar: RegistrarConfig,

    /// Controller configuration
    pub controller: ControllerConfig,

    /// Log level
    pub log_level: String,

    /// Whether to enable debug mode
    pub debug_mode: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            hashing: HashingConfig::default(),
            registrar: RegistrarConfig::default(),
            controller: ControllerConfig::default(),
            log_level: "info".to_string(),
            debug_mode: false,
        }
    }
}

impl CoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: CoreConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let controller = &self.controller;
        if controller.min_commitment_age >= controller.max_commitment_age {
            return Err(CoreError::InvalidCommitmentAges {
                min: controller.min_commitment_age.as_secs(),
                max: controller.max_commitment_age.as_secs(),
            });
        }
        if controller.min_registration_duration >= controller.max_registration_duration {
            return Err(CoreError::ConfigError(
                "min_registration_duration must be below max_registration_duration".to_string(),
            ));
        }
        if self.registrar.base_name.is_empty() || self.registrar.base_name.contains('.') {
            return Err(CoreError::ConfigError(format!(
                "base_name must be a single label, got {:?}",
                self.registrar.base_name
            )));
        }
        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::default();
        config.debug_mode = true;
        config.log_level = "debug".to_string();
        config
    }

    /// Create a testing configuration
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.debug_mode = true;
        config.log_level = "debug".to_string();
        config.registrar.base_name = "test".to_string();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();

        assert_eq!(config.hashing.algorithm, HashAlgorithm::Keccak256);
        assert_eq!(config.registrar.grace_period, Duration::from_secs(90 * DAY));
        assert_eq!(config.controller.min_commitment_age, Duration::from_secs(60));
        assert_eq!(config.controller.min_name_length, 3);
        assert_eq!(config.log_level, "info");
        assert!(!config.debug_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config() {
        let config = CoreConfig::testing();

        assert!(config.debug_mode);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.registrar.base_name, "test");
    }

    #[test]
    fn test_validate_rejects_inverted_commitment_ages() {
        let mut config = CoreConfig::default();
        config.controller.min_commitment_age = Duration::from_secs(100);
        config.controller.max_commitment_age = Duration::from_secs(100);

        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidCommitmentAges { min: 100, max: 100 })
        ));
    }

    #[test]
    fn test_validate_rejects_dotted_base_name() {
        let mut config = CoreConfig::default();
        config.registrar.base_name = "a.b".to_string();
        assert!(matches!(config.validate(), Err(CoreError::ConfigError(_))));
    }

    #[test]
    fn test_config_file_io() {
        let mut config = CoreConfig::default();
        config.registrar.max_burn_gas = 42;

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        config.to_file(path).unwrap();
        let loaded_config = CoreConfig::from_file(path).unwrap();

        assert_eq!(loaded_config.registrar.max_burn_gas, 42);
        assert_eq!(loaded_config.registrar.grace_period, config.registrar.grace_period);
        assert_eq!(loaded_config.hashing.algorithm, config.hashing.algorithm);
    }
}
