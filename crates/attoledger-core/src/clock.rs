//! Time source abstraction.
//!
//! Engines never read time themselves; callers obtain `now` from a [`Clock`]
//! and pass it into each operation.

use crate::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves time forward, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let next = self.now().saturating_add(secs);
        self.set(next);
        next
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
