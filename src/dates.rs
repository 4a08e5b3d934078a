//! Timestamps as they appear in the publish state.
//!
//! All stored timestamps use one canonical, human-readable format in the
//! site's reference timezone:
//!
//! ```text
//! 2024 March 05 09:30:00
//! ```
//!
//! Records written by older generations carry only the date
//! (`2024 March 05`); those still parse and sort as midnight.
//!
//! ## Explicit Dates
//!
//! Front matter may carry a `published:` value. Accepted shapes:
//!
//! | Input | Meaning |
//! |-------|---------|
//! | `now` | the run's current time |
//! | `2024-03-05T09:30:00+01:00` | RFC 3339, converted into the reference zone |
//! | `2024-03-05 09:30:00`, `2024-03-05T09:30:00`, `2024-03-05 09:30` | wall time in the reference zone |
//! | `2024-03-05`, `2024/03/05`, `March 5, 2024`, `2024 March 05` | midnight in the reference zone |
//!
//! Anything else is a [`DateError::InvalidDateFormat`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use thiserror::Error;

/// Canonical format for every timestamp stored in the publish state.
pub const CANONICAL_FORMAT: &str = "%Y %B %d %H:%M:%S";

/// Date-only canonical format used by older state files.
const LEGACY_DATE_FORMAT: &str = "%Y %B %d";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    CANONICAL_FORMAT,
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", LEGACY_DATE_FORMAT];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid date format: {0:?}")]
    InvalidDateFormat(String),
    #[error("invalid UTC offset {0:?} (expected e.g. \"-05:00\")")]
    InvalidOffset(String),
}

/// An explicit `published:` value from front matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplicitDate {
    /// The literal `now`.
    Now,
    /// A concrete point in time, already in the reference zone.
    At(DateTime<FixedOffset>),
}

/// Parse a UTC offset like `-05:00`, `+0130`, `Z` or `UTC`.
pub fn parse_offset(input: &str) -> Result<FixedOffset, DateError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| DateError::InvalidOffset(input.into()));
    }
    let invalid = || DateError::InvalidOffset(input.to_string());

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Render a timestamp in the canonical format.
pub fn format_canonical(at: &DateTime<FixedOffset>) -> String {
    at.format(CANONICAL_FORMAT).to_string()
}

/// Parse a stored canonical timestamp (full or legacy date-only).
///
/// Returns `None` for values no generation of the format ever produced.
/// The result is wall time in the reference zone, which is all that
/// ordering needs.
pub fn parse_canonical(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, CANONICAL_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, LEGACY_DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse an explicit front-matter date into the reference zone.
pub fn parse_explicit(input: &str, zone: &FixedOffset) -> Result<ExplicitDate, DateError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(ExplicitDate::Now);
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ExplicitDate::At(at.with_timezone(zone)));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| DateError::InvalidDateFormat(input.to_string()))?;

    zone.from_local_datetime(&naive)
        .single()
        .map(ExplicitDate::At)
        .ok_or_else(|| DateError::InvalidDateFormat(input.to_string()))
}
