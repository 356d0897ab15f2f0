//! Date helpers used for unit naming and manifest offsets.

use chrono::{Datelike, NaiveDate};

/// Format a date as `YYYYMMDD`.
pub fn compact_date(date: NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

/// Parse a `YYYYMMDD` string.
pub fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

/// Whole days from `base` to `date` (negative before the base date).
pub fn day_offset(date: NaiveDate, base: NaiveDate) -> i64 {
    (date - base).num_days()
}
