//! Transaction timing
//!
//! Wall-clock duration of a naming transaction, logged when it settles.

use std::time::{Duration, Instant};
use log::{debug, warn};
use uuid::Uuid;

use crate::types::Address;

/// Default duration above which a transaction is reported as slow
pub const SLOW_TRANSACTION: Duration = Duration::from_millis(50);

/// How a transaction settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Draft state replaced the live state
    Committed,

    /// Draft state was discarded
    RolledBack,
}

/// Measures one transaction from the moment it holds the state lock
#[derive(Debug, Clone)]
pub struct TxTimer {
    transaction: Uuid,
    sender: Address,
    start: Instant,
    slow_threshold: Duration,
}

impl TxTimer {
    /// Start timing `transaction` sent by `sender`
    pub fn start(transaction: Uuid, sender: Address) -> Self {
        TxTimer {
            transaction,
            sender,
            start: Instant::now(),
            slow_threshold: SLOW_TRANSACTION,
        }
    }

    /// Override the slow threshold
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Time since the transaction started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether the transaction exceeded the slow threshold
    pub fn is_slow(&self) -> bool {
        self.elapsed() > self.slow_threshold
    }

    /// Log the settlement; slow transactions are reported at warn level
    pub fn settle(&self, settlement: Settlement) -> Duration {
        let elapsed = self.elapsed();
        if self.is_slow() {
            warn!(
                "tx {} from {:?} {:?} after {:?} [SLOW]",
                self.transaction, self.sender, settlement, elapsed
            );
        } else {
            debug!("tx {} from {:?} {:?} after {:?}", self.transaction, self.sender, settlement, elapsed);
        }
        elapsed
    }
}
