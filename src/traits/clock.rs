//! Clock abstraction for testable timestamps.

use chrono::Utc;

use crate::types::TimeStamp;

/// Source of record timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeStamp<Utc>;
}

/// Production implementation that uses the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp<Utc> {
        TimeStamp::new()
    }
}
