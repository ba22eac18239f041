//! Time source for the cache and call budget
//!
//! Every freshness and window check reads "now" through a [`Clock`] so tests can
//! move time forward without sleeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
///
/// Clones share the same instant, so a test can hand one clone to a
/// `Forecaster` and advance time through another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward (or backward, for negative durations)
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jumps to an absolute instant
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);

        clock.advance(Duration::minutes(25));

        assert_eq!(clock.now(), start + Duration::minutes(25));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let handle = clock.clone();

        handle.advance(Duration::hours(2));

        assert_eq!(clock.now(), start + Duration::hours(2));
    }

    #[test]
    fn test_system_clock_is_close_to_now() {
        let before = Utc::now();
        let now = SystemClock.now();
        let after = Utc::now();

        assert!(now >= before && now <= after);
    }
}
