//! Injected time source
//!
//! Engines never read the system clock directly; they take a [`Clock`] so
//! release schedules can be exercised at arbitrary points in time.

use chrono::Utc;

/// Unix-seconds time source.
pub trait Clock {
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// Settable clock for tests.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    now: u64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self { now }
    }

    pub fn set(&mut self, now: u64) {
        self.now = now;
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now
    }
}
