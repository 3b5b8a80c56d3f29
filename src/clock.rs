// File: src/clock.rs
use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use std::time::Duration;

/// Source of wall-clock time for debounce deadlines, history timestamps and
/// cache ages.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        *self.now.lock() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Local date and time, e.g. "3/14/2026, 9:26:53 AM".
pub fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

/// Local date with hours and minutes, e.g. "3/14/2026 09:26".
pub fn format_local_short(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%-m/%-d/%Y %H:%M").to_string()
}
