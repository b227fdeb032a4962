//! Mock clock with a controllable time value.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::traits::Clock;
use crate::types::TimeStamp;

const NANOS_PER_SEC: i64 = 1_000_000_000;

#[derive(Debug, Clone)]
pub struct MockClock {
    nanos: Arc<AtomicI64>,
}

impl MockClock {
    /// Start at the given unix time in seconds.
    pub fn new(unix_secs: i64) -> Self {
        Self {
            nanos: Arc::new(AtomicI64::new(unix_secs * NANOS_PER_SEC)),
        }
    }

    /// 2024-01-01 00:00:00 UTC
    pub fn default_time() -> Self {
        Self::new(1_704_067_200)
    }

    pub fn advance_secs(&self, secs: i64) {
        self.nanos.fetch_add(secs * NANOS_PER_SEC, Ordering::SeqCst);
    }

    pub fn set(&self, unix_secs: i64) {
        self.nanos.store(unix_secs * NANOS_PER_SEC, Ordering::SeqCst);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::default_time()
    }
}

impl Clock for MockClock {
    fn now(&self) -> TimeStamp<Utc> {
        TimeStamp::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
