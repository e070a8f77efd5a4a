//! Price oracles
//!
//! [`FixedPriceOracle`] charges an annual rent depending on label length.
//! [`ExponentialPremiumOracle`] adds a premium to names that just left
//! their grace period, halving every day, so that a freshly released name
//! is not won by whoever reacts first.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use leased_names_core::controller::{Price, PriceOracle};
use leased_names_core::utils::Clock;
use leased_names_core::Timestamp;

use crate::error::{PeripheryError, Result};

const DAY: u64 = 24 * 60 * 60;
const YEAR: u64 = 365 * DAY;

/// Annual rent by label length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPriceOracle {
    /// Annual rent for labels of 1, 2, ... characters; the last entry
    /// applies to every longer label
    annual_rent: Vec<u128>,
}

impl FixedPriceOracle {
    /// Create an oracle from a non-empty annual rent table
    pub fn new(annual_rent: Vec<u128>) -> Result<Self> {
        if annual_rent.is_empty() {
            return Err(PeripheryError::InvalidPriceTable("rent table is empty".to_string()));
        }
        Ok(FixedPriceOracle { annual_rent })
    }

    /// Load a rent table from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let oracle: FixedPriceOracle = serde_json::from_reader(file)?;
        Self::new(oracle.annual_rent)
    }

    /// Save the rent table to a JSON file
    pub fn to_file(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Rent of `name` for `duration` seconds
    pub fn rent(&self, name: &str, duration: u64) -> u128 {
        let len = name.chars().count().max(1);
        let annual = self
            .annual_rent
            .get(len - 1)
            .or_else(|| self.annual_rent.last())
            .copied()
            .unwrap_or(0);
        annual.saturating_mul(u128::from(duration)) / u128::from(YEAR)
    }
}

impl PriceOracle for FixedPriceOracle {
    fn price(&self, name: &str, _expires: Timestamp, duration: u64) -> Price {
        Price {
            base: self.rent(name, duration),
            premium: 0,
        }
    }
}

/// Rent plus a decaying premium for recently released names
///
/// The premium is priced at the oracle's own clock. Give it the same clock
/// as the [`NameService`](leased_names_core::NameService) it prices for,
/// otherwise quotes drift from the transaction time.
#[derive(Clone)]
pub struct ExponentialPremiumOracle {
    rent: FixedPriceOracle,
    start_premium: u128,
    total_days: u32,
    grace_period: u64,
    clock: Arc<dyn Clock>,
}

impl Debug for ExponentialPremiumOracle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExponentialPremiumOracle")
            .field("rent", &self.rent)
            .field("start_premium", &self.start_premium)
            .field("total_days", &self.total_days)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

impl ExponentialPremiumOracle {
    /// Create an oracle whose premium starts at `start_premium` when a name
    /// leaves grace and reaches zero after `total_days`
    pub fn new(
        rent: FixedPriceOracle,
        start_premium: u128,
        total_days: u32,
        grace_period: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ExponentialPremiumOracle {
            rent,
            start_premium,
            total_days,
            grace_period,
            clock,
        }
    }

    /// Premium of a name with the given expiry, at `now`
    pub fn premium_at(&self, expires: Timestamp, now: Timestamp) -> u128 {
        if expires == 0 {
            return 0;
        }
        let released = expires.saturating_add(self.grace_period);
        if now < released {
            return 0;
        }

        let elapsed = now - released;
        let end_value = self.halve(self.start_premium, u64::from(self.total_days));
        self.decayed(elapsed).saturating_sub(end_value)
    }

    /// `start_premium / 2^(elapsed days)`, linear within a day
    fn decayed(&self, elapsed: u64) -> u128 {
        let whole = self.halve(self.start_premium, elapsed / DAY);
        let fraction = u128::from(elapsed % DAY);
        let span = 2 * u128::from(DAY);
        let drop = whole
            .checked_mul(fraction)
            .map_or_else(|| whole / span * fraction, |scaled| scaled / span);
        whole - drop
    }

    fn halve(&self, value: u128, times: u64) -> u128 {
        if times >= 128 {
            0
        } else {
            value >> times
        }
    }
}

impl PriceOracle for ExponentialPremiumOracle {
    fn price(&self, name: &str, expires: Timestamp, duration: u64) -> Price {
        Price {
            base: self.rent.rent(name, duration),
            premium: self.premium_at(expires, self.clock.now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leased_names_core::utils::ManualClock;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    const GRACE: u64 = 90 * DAY;

    fn table() -> FixedPriceOracle {
        FixedPriceOracle::new(vec![0, 0, 640, 160, 5]).unwrap()
    }

    #[rstest]
    #[case("abc", YEAR, 640)]
    #[case("abcd", YEAR, 160)]
    #[case("alice", YEAR, 5)]
    #[case("averyveryverylongname", 2 * YEAR, 10)]
    #[case("abcd", YEAR / 2, 80)]
    fn test_rent_by_length(#[case] name: &str, #[case] duration: u64, #[case] expected: u128) {
        assert_eq!(table().price(name, 0, duration), Price { base: expected, premium: 0 });
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(
            FixedPriceOracle::new(Vec::new()),
            Err(PeripheryError::InvalidPriceTable(_))
        ));
    }

    #[test]
    fn test_rent_table_file_io() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();
        table().to_file(path).unwrap();
        assert_eq!(FixedPriceOracle::from_file(path).unwrap(), table());
    }

    #[test]
    fn test_premium_decays() {
        let clock = ManualClock::new(0);
        let oracle = ExponentialPremiumOracle::new(table(), 1 << 20, 21, GRACE, Arc::new(clock.clone()));
        let expires = 1_000;
        let released = expires + GRACE;

        assert_eq!(oracle.premium_at(0, released), 0);
        assert_eq!(oracle.premium_at(expires, released - 1), 0);

        let end = (1u128 << 20) >> 21;
        assert_eq!(oracle.premium_at(expires, released), (1 << 20) - end);
        assert_eq!(oracle.premium_at(expires, released + DAY), (1 << 19) - end);
        assert_eq!(oracle.premium_at(expires, released + DAY / 2), (1 << 20) - (1 << 18) - end);
        assert_eq!(oracle.premium_at(expires, released + 21 * DAY), 0);
        assert_eq!(oracle.premium_at(expires, released + 400 * DAY), 0);

        clock.set(released + DAY);
        let price = oracle.price("alice", expires, YEAR);
        assert_eq!(price, Price { base: 5, premium: (1 << 19) - end });
    }

    proptest::proptest! {
        #[test]
        fn prop_premium_never_increases(start in 0u128..=u128::from(u64::MAX), a in 0u64..40 * DAY, b in 0u64..40 * DAY) {
            let oracle = ExponentialPremiumOracle::new(table(), start, 21, GRACE, Arc::new(ManualClock::new(0)));
            let released = 1 + GRACE;
            let (early, late) = (a.min(b), a.max(b));
            proptest::prop_assert!(oracle.premium_at(1, released + early) >= oracle.premium_at(1, released + late));
            proptest::prop_assert!(oracle.premium_at(1, released + early) <= start);
        }
    }
}
