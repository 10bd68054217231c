//! General-purpose date parsing for cells and window bounds.
//!
//! Accepts the common shapes found in spreadsheet exports: ISO 8601 dates and
//! datetimes, RFC 3339 / RFC 2822 timestamps, slash-separated dates (year-first
//! or US month-first) and English month names. Values with an explicit offset
//! are converted to UTC; everything else is taken as wall-clock time. Date-only
//! values resolve to midnight.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{DateError, DateResult};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p", // Excel: 1/5/2024 10:30:00 PM
    "%m/%d/%Y %I:%M %p",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M",
    "%b %d, %Y %I:%M:%S %p",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",  // US: 01/15/2024
    "%m-%d-%Y",  // 01-15-2024
    "%b %d, %Y", // Jan 15, 2024
    "%B %d, %Y", // January 15, 2024
    "%b %d %Y",  // Jan 15 2024
    "%d %b %Y",  // 15 Jan 2024
    "%d %B %Y",  // 15 January 2024
    "%a %b %d %Y", // Mon Jan 15 2024
    "%A, %B %d, %Y", // Monday, January 15, 2024
    "%a, %b %d, %Y", // Mon, Jan 15, 2024
];

/// Zone suffixes meaning UTC that the fixed formats do not cover.
const UTC_SUFFIXES: &[&str] = &[" UTC", " GMT", "Z"];

/// Parse a cell or bound into a point in time.
///
/// Returns `None` when no supported format matches. Callers filtering rows
/// treat `None` as "keep".
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.naive_utc());
    }
    parse_naive(value).or_else(|| {
        UTC_SUFFIXES
            .iter()
            .find_map(|suffix| value.strip_suffix(suffix))
            .and_then(|rest| parse_naive(rest.trim_end()))
    })
}

/// Parse a user-supplied window bound. Unlike cells, bounds must be valid.
pub fn parse_bound(value: &str) -> DateResult<NaiveDateTime> {
    parse_datetime(value).ok_or_else(|| DateError::InvalidBound {
        value: value.to_string(),
    })
}

/// Parse an optional bound; absent or blank input means "no bound".
pub fn parse_optional_bound(value: Option<&str>) -> DateResult<Option<NaiveDateTime>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_bound(v).map(Some),
    }
}

/// Try every offset-free shape, most specific first.
fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    if let Some(dt) = try_parse_datetime(value) {
        return Some(dt);
    }
    if let Some(d) = try_parse_date(value) {
        return d.and_hms_opt(0, 0, 0);
    }
    try_parse_partial(value).and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn try_parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn try_parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// `YYYY-MM` and `YYYY`, resolved to the first day.
fn try_parse_partial(value: &str) -> Option<NaiveDate> {
    if !value.is_ascii() {
        return None;
    }
    let bytes = value.as_bytes();
    if value.len() == 7 && bytes[4] == b'-' {
        let year = value[0..4].parse::<i32>().ok()?;
        let month = value[5..7].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    if value.len() == 4 && bytes.iter().all(u8::is_ascii_digit) {
        let year = value.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    None
}
