//! Utility functions and helpers
//!
//! Clocks, timing and logging setup used throughout the codebase.

pub mod clock;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timer::{Settlement, TxTimer, SLOW_TRANSACTION};

use log::LevelFilter;

/// Initialize `env_logger` at the given level
///
/// `RUST_LOG` still takes precedence. Calling this more than once is harmless.
pub fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .try_init();
}

/// Convert a byte array to a hex string
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Convert a hex string, with or without `0x`, to a 32 byte array
pub fn hex_to_bytes32(input: &str) -> crate::Result<[u8; 32]> {
    let raw = hex::decode(input.trim_start_matches("0x"))?;
    if raw.len() != 32 {
        return Err(crate::error::CoreError::MalformedCall(format!(
            "expected 32 bytes, got {}",
            raw.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        init_logging("not-a-level");
    }

    #[test]
    fn test_hex_conversion() {
        let bytes = [0x12u8; 32];
        let hex = bytes_to_hex(&bytes);
        assert_eq!(hex_to_bytes32(&hex).unwrap(), bytes);
        assert_eq!(hex_to_bytes32(&format!("0x{}", hex)).unwrap(), bytes);

        assert!(hex_to_bytes32("invalid").is_err());
        assert!(hex_to_bytes32("1234").is_err());
    }
}
