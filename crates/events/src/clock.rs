//! Injectable time source
//!
//! Event timestamps are read through [`Clock`] so tests can pin them.

use std::fmt;

use chrono::{DateTime, Utc};

/// Provides the current time
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant, UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a fixed instant, for tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
