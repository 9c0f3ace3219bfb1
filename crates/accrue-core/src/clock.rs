//! Time source for settlement.
//!
//! Pools read the clock at the start of each operation and never set it.
//! [`ManualClock`] is the settable harness clock used by tests and the
//! scenario runner; it refuses to move backward.

use crate::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic, read-only source of seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock seconds since the Unix epoch
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

/// Clock errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("Clock cannot move backward from {current} to {requested}")]
    Regression {
        current: Timestamp,
        requested: Timestamp,
    },

    #[error("Clock overflow")]
    Overflow,
}

/// Explicitly settable clock
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Jump forward to `timestamp`
    pub fn set(&self, timestamp: Timestamp) -> Result<(), ClockError> {
        let current = self.now.load(Ordering::SeqCst);
        if timestamp < current {
            return Err(ClockError::Regression {
                current,
                requested: timestamp,
            });
        }
        self.now.store(timestamp, Ordering::SeqCst);
        Ok(())
    }

    /// Move forward by `seconds`
    pub fn advance(&self, seconds: u64) -> Result<Timestamp, ClockError> {
        let next = self
            .now
            .load(Ordering::SeqCst)
            .checked_add(seconds)
            .ok_or(ClockError::Overflow)?;
        self.now.store(next, Ordering::SeqCst);
        Ok(next)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
