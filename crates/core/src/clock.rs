//! Time source abstraction.
//!
//! Every state transition reads "now" through a [`Clock`] handed in by the
//! caller, so tests can pin and advance time without touching entity
//! internals.

use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::types::Timestamp;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: Timestamp) {
        *self.lock() = instant;
    }

    /// Move forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut current = self.lock();
        *current += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Timestamp> {
        // A poisoned lock still holds a valid timestamp.
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.lock()
    }
}
