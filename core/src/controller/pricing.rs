//! Price oracle interface

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Quoted price of a registration or renewal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Price {
    /// Rent for the requested duration
    pub base: u128,

    /// Surcharge for a recently released name
    pub premium: u128,
}

impl Price {
    /// Rent plus premium, saturating
    pub fn total(&self) -> u128 {
        self.base.saturating_add(self.premium)
    }
}

/// Pluggable pricing
#[cfg_attr(test, mockall::automock)]
pub trait PriceOracle: Send + Sync {
    /// Price of holding `name` for `duration` seconds
    ///
    /// `expires` is the label's current expiry, zero if it was never
    /// registered.
    fn price(&self, name: &str, expires: Timestamp, duration: u64) -> Price;
}
