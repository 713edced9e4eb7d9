//! Core types shared across the crate.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

use crate::constants::dashboard::{DAYS_BACK_HINT, MAX_DAYS_BACK};
use crate::error::{Error, Result};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Inclusive reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Window start.
    pub start: DateTime<Utc>,
    /// Window end.
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range from explicit bounds.
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` days ending now.
    ///
    /// `days` must be between 1 and [`MAX_DAYS_BACK`].
    pub fn last_days(days: i64) -> Result<Self> {
        let invalid = || Error::config(format!("Invalid reporting window: {days} days"), DAYS_BACK_HINT);
        if !(1..=MAX_DAYS_BACK).contains(&days) {
            return Err(invalid());
        }
        let end = Utc::now();
        let start = Duration::try_days(days)
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or_else(invalid)?;
        Ok(Self { start, end })
    }

    /// Length in whole days, rounded up.
    pub fn period_days(&self) -> i64 {
        let millis = (self.end - self.start).num_milliseconds();
        (millis + MILLIS_PER_DAY - 1).div_euclid(MILLIS_PER_DAY)
    }

    /// The window of equal length that ends just before this one starts.
    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::days(self.period_days()),
            end: self.start - Duration::milliseconds(1),
        }
    }

    /// Calendar days from start to end (exclusive of partial days).
    pub fn whole_days(&self) -> i64 {
        (self.end.date_naive() - self.start.date_naive()).num_days()
    }

    /// Start date as a calendar date.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// End date as a calendar date.
    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

/// RFC 3339 UTC timestamp with milliseconds and a `Z` suffix.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn period_days_rounds_up() {
        assert_eq!(DateRange::new(at(2024, 1, 1, 0), at(2024, 1, 8, 0)).period_days(), 7);
        assert_eq!(DateRange::new(at(2024, 1, 1, 0), at(2024, 1, 8, 1)).period_days(), 8);
    }

    #[test]
    fn previous_window_ends_before_start() {
        let range = DateRange::new(at(2024, 1, 8, 0), at(2024, 1, 15, 0));
        let prev = range.previous();
        assert_eq!(prev.start, at(2024, 1, 1, 0));
        assert_eq!(prev.end, at(2024, 1, 8, 0) - Duration::milliseconds(1));
    }

    #[test]
    fn last_days_spans_requested_window() {
        let range = DateRange::last_days(30).unwrap();
        assert_eq!(range.end - range.start, Duration::days(30));
        assert_eq!(range.period_days(), 30);
    }

    #[test]
    fn last_days_rejects_out_of_range_windows() {
        for days in [0, -7, MAX_DAYS_BACK + 1, 200_000_000_000_000, i64::MAX, i64::MIN] {
            let err = DateRange::last_days(days).unwrap_err();
            assert!(matches!(err, Error::Config { .. }), "{days} days should be rejected");
        }
        assert!(DateRange::last_days(MAX_DAYS_BACK).is_ok());
    }

    #[test]
    fn iso_timestamp_matches_browser_format() {
        assert_eq!(iso_timestamp(&at(2024, 3, 5, 9)), "2024-03-05T09:00:00.000Z");
    }
}
