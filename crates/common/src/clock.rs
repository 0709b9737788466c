//! Clock abstraction for snapshot and audit timestamps.
//!
//! Every timestamp wmark records (history snapshots, activity-log entries)
//! comes from an injected [`Clock`], so tests can pin time instead of
//! racing the wall clock.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as Unix milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests and deterministic replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock frozen at the Unix epoch.
    pub fn at_epoch() -> Self {
        Self::starting_at(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        let clock = SystemClock;
        let delta = Utc::now() - clock.now();
        assert!(delta.num_seconds().abs() < 5);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_epoch();
        assert_eq!(clock.now_millis(), 0);

        clock.advance(Duration::milliseconds(1500));
        assert_eq!(clock.now_millis(), 1500);
    }

    #[test]
    fn test_manual_clock_behind_trait_object() {
        let clock: Box<dyn Clock> = Box::new(ManualClock::at_epoch());
        assert_eq!(clock.now(), DateTime::<Utc>::UNIX_EPOCH);
    }
}
