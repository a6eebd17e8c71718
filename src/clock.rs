//! Time sources for the ledger.
//!
//! Every date the ledger stamps comes from an injected [`Clock`], so tests can
//! move time forward explicitly instead of waiting on the system clock.

use std::cell::Cell;

use chrono::{DateTime, Days, NaiveDate, Utc};

/// A source of the current time
pub trait Clock {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar day
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Reads the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Time only moves forward; advancing past the representable range leaves
/// the clock where it was.
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Current instant
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock set to midnight UTC on `day`
    #[must_use]
    pub fn on(day: NaiveDate) -> Self {
        Self { now: Cell::new(day.and_time(chrono::NaiveTime::MIN).and_utc()) }
    }

    /// Move the clock forward by whole days
    pub fn advance_days(&self, days: u64) -> NaiveDate {
        if let Some(next) = self.now.get().checked_add_days(Days::new(days)) {
            self.now.set(next);
        }
        self.today()
    }

    /// Jump to midnight on a later day; earlier days are ignored
    pub fn set_day(&self, day: NaiveDate) {
        let target = day.and_time(chrono::NaiveTime::MIN).and_utc();
        if target > self.now.get() {
            self.now.set(target);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a date in tests
    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn test_manual_clock_only_moves_forward() {
        let clock = ManualClock::on(day(2024, 1, 10));
        assert_eq!(clock.advance_days(5), day(2024, 1, 15));

        clock.set_day(day(2024, 1, 1));
        assert_eq!(clock.today(), day(2024, 1, 15));

        clock.set_day(day(2024, 2, 1));
        assert_eq!(clock.today(), day(2024, 2, 1));
    }
}
