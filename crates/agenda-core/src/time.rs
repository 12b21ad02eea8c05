//! Agenda date handling.
//!
//! Dates cross the tool boundary as `YYYY-MM-DD` strings. They are checked
//! against that exact shape before being parsed, so inputs like
//! `12-25-2024` or `2024-1-5` are rejected early.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use regex::Regex;
use thiserror::Error;

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Invalid date regex"));

/// Errors for caller-supplied agenda dates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// The input does not look like `YYYY-MM-DD`.
    #[error("invalid date format '{0}': expected YYYY-MM-DD (e.g., 2024-12-25)")]
    Format(String),

    /// The input has the right shape but is not a calendar date.
    #[error("invalid date '{0}': no such calendar day")]
    OutOfRange(String),
}

/// Parses a `YYYY-MM-DD` agenda date.
pub fn parse_agenda_date(input: &str) -> Result<NaiveDate, DateError> {
    if !DATE_PATTERN.is_match(input) {
        return Err(DateError::Format(input.to_string()));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| DateError::OutOfRange(input.to_string()))
}

/// Returns the local-time window `[midnight, midnight + 24h)` for a date.
///
/// When local midnight does not exist (DST gap), the earliest valid
/// instant of the day is used instead.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Local>, DateTime<Local>) {
    let start = local_start_of_day(date);
    (start, start + Duration::hours(24))
}

fn local_start_of_day(date: NaiveDate) -> DateTime<Local> {
    let mut naive = date.and_time(NaiveTime::MIN);
    // Gaps are at most a couple of hours; walk forward until a local time exists.
    for _ in 0..24 {
        if let Some(dt) = Local.from_local_datetime(&naive).earliest() {
            return dt;
        }
        naive += Duration::hours(1);
    }
    Local.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
