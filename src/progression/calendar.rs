//! Calendar-day utilities for streaks and leaderboard windows
//!
//! All days are UTC calendar dates. Timestamps are Unix milliseconds, the
//! same unit the ledger stores.

use chrono::{DateTime, Days, NaiveDate, Utc};

/// Calendar day containing a Unix timestamp in milliseconds.
///
/// # Example
/// ```
/// use questline::progression::calendar::day_of;
/// let day = day_of(1703766896000); // 2023-12-28 12:34:56 UTC
/// assert_eq!(day.to_string(), "2023-12-28");
/// ```
pub fn day_of(timestamp_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(timestamp_ms)
        .unwrap_or_else(Utc::now)
        .date_naive()
}

/// Day bucket string ("YYYY-MM-DD") for a timestamp in milliseconds.
pub fn day_bucket(timestamp_ms: i64) -> String {
    day_of(timestamp_ms).format("%Y-%m-%d").to_string()
}

/// Midnight (UTC) of the given day, in milliseconds.
pub fn start_of_day_ms(day: NaiveDate) -> i64 {
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(i64::MIN)
}

/// Midnight of the day `days` calendar days before `now`.
pub fn days_back_start_ms(now: DateTime<Utc>, days: u64) -> i64 {
    now.date_naive()
        .checked_sub_days(Days::new(days))
        .map(start_of_day_ms)
        .unwrap_or(i64::MIN)
}

/// Whether `earlier` is exactly the calendar day before `later`.
pub fn is_previous_day(earlier: NaiveDate, later: NaiveDate) -> bool {
    later.pred_opt() == Some(earlier)
}
