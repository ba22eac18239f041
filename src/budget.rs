//! Outbound call budget for the weather provider
//!
//! Counts provider requests against an hourly and a daily ceiling. Windows are
//! reset lazily: every read or write first checks whether the current window has
//! elapsed, so there is no background timer to manage.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::Clock;

/// Remaining hourly calls at or below which the budget counts as near its limit
pub const NEAR_LIMIT_HOURLY: i64 = 5;

/// Remaining daily calls at or below which the budget counts as near its limit
pub const NEAR_LIMIT_DAILY: i64 = 50;

/// Length of the hourly window
fn hourly_window() -> Duration {
    Duration::hours(1)
}

/// Length of the daily window
fn daily_window() -> Duration {
    Duration::hours(24)
}

/// Coarse health of the remaining budget, for status displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Healthy,
    Warning,
    Critical,
}

impl UsageLevel {
    /// Classifies remaining calls
    ///
    /// Critical at 3 hourly or 50 daily calls left, warning at 10 hourly or 200
    /// daily.
    pub fn classify(hourly_remaining: i64, daily_remaining: i64) -> Self {
        if hourly_remaining <= 3 || daily_remaining <= 50 {
            UsageLevel::Critical
        } else if hourly_remaining <= 10 || daily_remaining <= 200 {
            UsageLevel::Warning
        } else {
            UsageLevel::Healthy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UsageLevel::Healthy => "healthy",
            UsageLevel::Warning => "warning",
            UsageLevel::Critical => "critical",
        }
    }
}

/// Point-in-time view of the call budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub hourly_remaining: i64,
    pub daily_remaining: i64,
    pub hourly_limit: i64,
    pub daily_limit: i64,
    pub near_limit: bool,
    pub level: UsageLevel,
}

/// Hourly and daily provider call counter
///
/// The tracker only reports state. Callers check [`CallBudget::has_reached_limit`]
/// before calling the provider and call [`CallBudget::record_call`] once per
/// successful request. Counts are not clamped.
#[derive(Debug)]
pub struct CallBudget {
    hourly_count: i64,
    daily_count: i64,
    hourly_window_start: DateTime<Utc>,
    daily_window_start: DateTime<Utc>,
    hourly_limit: i64,
    daily_limit: i64,
    clock: Arc<dyn Clock>,
}

impl CallBudget {
    /// Creates a tracker with zero counts and both windows starting now
    pub fn new(hourly_limit: i64, daily_limit: i64, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            hourly_count: 0,
            daily_count: 0,
            hourly_window_start: now,
            daily_window_start: now,
            hourly_limit,
            daily_limit,
            clock,
        }
    }

    /// Starts a new window for each window whose length has elapsed
    pub fn reset_if_window_elapsed(&mut self) {
        let now = self.clock.now();

        if now - self.hourly_window_start >= hourly_window() {
            if self.hourly_count > 0 {
                tracing::info!(calls = self.hourly_count, "Resetting hourly API call counter");
            }
            self.hourly_count = 0;
            self.hourly_window_start = now;
        }

        if now - self.daily_window_start >= daily_window() {
            if self.daily_count > 0 {
                tracing::info!(calls = self.daily_count, "Resetting daily API call counter");
            }
            self.daily_count = 0;
            self.daily_window_start = now;
        }
    }

    /// Calls left in the current hourly window
    pub fn remaining_hourly(&mut self) -> i64 {
        self.reset_if_window_elapsed();
        self.hourly_limit - self.hourly_count
    }

    /// Calls left in the current daily window
    pub fn remaining_daily(&mut self) -> i64 {
        self.reset_if_window_elapsed();
        self.daily_limit - self.daily_count
    }

    pub fn is_near_limit(&mut self) -> bool {
        self.remaining_hourly() <= NEAR_LIMIT_HOURLY || self.remaining_daily() <= NEAR_LIMIT_DAILY
    }

    pub fn has_reached_limit(&mut self) -> bool {
        self.remaining_hourly() <= 0 || self.remaining_daily() <= 0
    }

    /// Counts one successful provider request against both windows
    pub fn record_call(&mut self) {
        self.reset_if_window_elapsed();
        self.hourly_count += 1;
        self.daily_count += 1;
        tracing::debug!(
            hourly = self.hourly_count,
            hourly_limit = self.hourly_limit,
            daily = self.daily_count,
            daily_limit = self.daily_limit,
            "Recorded provider call"
        );
    }

    /// Estimated wait until calls are allowed again
    ///
    /// Zero when the budget is not exhausted. When both windows are exhausted
    /// the later reset wins.
    pub fn retry_after(&mut self) -> Duration {
        self.reset_if_window_elapsed();
        let now = self.clock.now();
        let mut wait = Duration::zero();

        if self.hourly_limit - self.hourly_count <= 0 {
            wait = wait.max(self.hourly_window_start + hourly_window() - now);
        }
        if self.daily_limit - self.daily_count <= 0 {
            wait = wait.max(self.daily_window_start + daily_window() - now);
        }

        wait.max(Duration::zero())
    }

    pub fn snapshot(&mut self) -> UsageSnapshot {
        let hourly_remaining = self.remaining_hourly();
        let daily_remaining = self.remaining_daily();
        UsageSnapshot {
            hourly_remaining,
            daily_remaining,
            hourly_limit: self.hourly_limit,
            daily_limit: self.daily_limit,
            near_limit: hourly_remaining <= NEAR_LIMIT_HOURLY
                || daily_remaining <= NEAR_LIMIT_DAILY,
            level: UsageLevel::classify(hourly_remaining, daily_remaining),
        }
    }

    pub fn hourly_window_start(&self) -> DateTime<Utc> {
        self.hourly_window_start
    }

    pub fn daily_window_start(&self) -> DateTime<Utc> {
        self.daily_window_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 9, 0, 0).unwrap()
    }

    fn budget(hourly: i64, daily: i64) -> (CallBudget, ManualClock) {
        let clock = ManualClock::new(start());
        (CallBudget::new(hourly, daily, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_new_budget_is_full() {
        let (mut budget, _clock) = budget(25, 1000);

        assert_eq!(budget.remaining_hourly(), 25);
        assert_eq!(budget.remaining_daily(), 1000);
        assert!(!budget.is_near_limit());
        assert!(!budget.has_reached_limit());
        assert_eq!(budget.hourly_window_start(), start());
    }

    #[test]
    fn test_record_call_counts_both_windows() {
        let (mut budget, _clock) = budget(25, 1000);

        budget.record_call();
        budget.record_call();

        assert_eq!(budget.remaining_hourly(), 23);
        assert_eq!(budget.remaining_daily(), 998);
    }

    #[test]
    fn test_hourly_limit_reached() {
        let (mut budget, _clock) = budget(25, 1000);

        for _ in 0..25 {
            budget.record_call();
        }

        assert!(budget.has_reached_limit());
        assert!(budget.remaining_hourly() <= 0);
    }

    #[test]
    fn test_counts_are_not_clamped() {
        let (mut budget, _clock) = budget(2, 1000);

        for _ in 0..3 {
            budget.record_call();
        }

        assert_eq!(budget.remaining_hourly(), -1);
    }

    #[test]
    fn test_near_limit_hourly_threshold() {
        let (mut budget, _clock) = budget(25, 1000);

        for _ in 0..19 {
            budget.record_call();
        }
        assert!(!budget.is_near_limit(), "6 left is not near the limit");

        budget.record_call();
        assert!(budget.is_near_limit(), "5 left is near the limit");
        assert!(!budget.has_reached_limit());
    }

    #[test]
    fn test_near_limit_daily_threshold() {
        let (mut budget, _clock) = budget(1000, 60);

        for _ in 0..10 {
            budget.record_call();
        }

        assert_eq!(budget.remaining_daily(), 50);
        assert!(budget.is_near_limit());
    }

    #[test]
    fn test_daily_limit_reached() {
        let (mut budget, _clock) = budget(100, 3);

        for _ in 0..3 {
            budget.record_call();
        }

        assert!(budget.has_reached_limit());
        assert_eq!(budget.remaining_hourly(), 97);
    }

    #[test]
    fn test_hourly_window_resets_after_an_hour() {
        let (mut budget, clock) = budget(25, 1000);
        for _ in 0..25 {
            budget.record_call();
        }

        clock.advance(Duration::minutes(59));
        assert!(budget.has_reached_limit());

        clock.advance(Duration::minutes(1));
        assert_eq!(budget.remaining_hourly(), 25);
        assert_eq!(budget.hourly_window_start(), start() + Duration::hours(1));
        // Daily window is untouched
        assert_eq!(budget.remaining_daily(), 975);
        assert_eq!(budget.daily_window_start(), start());
    }

    #[test]
    fn test_daily_window_resets_after_a_day() {
        let (mut budget, clock) = budget(25, 30);
        for _ in 0..20 {
            budget.record_call();
        }

        clock.advance(Duration::hours(24));

        assert_eq!(budget.remaining_daily(), 30);
        assert_eq!(budget.remaining_hourly(), 25);
        assert_eq!(budget.daily_window_start(), start() + Duration::hours(24));
    }

    #[test]
    fn test_retry_after_counts_down_hourly_window() {
        let (mut budget, clock) = budget(2, 1000);
        budget.record_call();
        budget.record_call();

        clock.advance(Duration::minutes(15));

        assert_eq!(budget.retry_after(), Duration::minutes(45));
    }

    #[test]
    fn test_retry_after_is_zero_with_budget_left() {
        let (mut budget, _clock) = budget(2, 1000);
        budget.record_call();

        assert_eq!(budget.retry_after(), Duration::zero());
    }

    #[test]
    fn test_retry_after_uses_daily_window_when_exhausted() {
        let (mut budget, clock) = budget(100, 2);
        budget.record_call();
        budget.record_call();

        clock.advance(Duration::hours(2));

        assert_eq!(budget.retry_after(), Duration::hours(22));
    }

    #[test]
    fn test_snapshot_levels() {
        let (mut budget, _clock) = budget(25, 1000);
        assert_eq!(budget.snapshot().level, UsageLevel::Healthy);

        for _ in 0..15 {
            budget.record_call();
        }
        let snapshot = budget.snapshot();
        assert_eq!(snapshot.hourly_remaining, 10);
        assert_eq!(snapshot.level, UsageLevel::Warning);
        assert!(!snapshot.near_limit);

        for _ in 0..7 {
            budget.record_call();
        }
        let snapshot = budget.snapshot();
        assert_eq!(snapshot.level, UsageLevel::Critical);
        assert!(snapshot.near_limit);
    }

    #[test]
    fn test_usage_level_daily_thresholds() {
        assert_eq!(UsageLevel::classify(20, 200), UsageLevel::Warning);
        assert_eq!(UsageLevel::classify(20, 50), UsageLevel::Critical);
        assert_eq!(UsageLevel::classify(20, 201), UsageLevel::Healthy);
    }
}
