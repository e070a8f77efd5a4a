//! Ledger clock
//!
//! Every timing rule (commitment ages, expiry, grace, unregister cool-down)
//! is measured against one shared, monotonically non-decreasing clock.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use chrono::Utc;

use crate::types::Timestamp;

/// Source of ledger time in seconds
pub trait Clock: Debug + Send + Sync {
    /// Current time
    fn now(&self) -> Timestamp;
}

/// Wall clock, never running backwards within a process
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    /// Create a system clock
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Utc::now().timestamp().max(0) as u64;
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Manually advanced clock for tests and simulations
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock starting at `start`
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Move the clock forward by `secs`
    pub fn advance(&self, secs: u64) -> Timestamp {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }

    /// Move the clock to `at`; earlier times are ignored
    pub fn set(&self, at: Timestamp) -> Timestamp {
        self.now.fetch_max(at, Ordering::SeqCst).max(at)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
