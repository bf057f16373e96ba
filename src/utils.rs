//! Utility functions for date handling and string truncation.
//!
//! This module provides helper functions used throughout the application:
//! - Flexible parsing of the dates the reasoning engine writes
//! - The month-range phrase used in search queries
//! - Character-safe truncation for engine input and for logging
//! - JSON error detection for handling truncated engine responses

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use tracing::instrument;

/// Date-time layouts tried in order before falling back to date-only ones.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts. `DD/MM/YYYY` is how Greek listings write dates.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Parse a date string in any of the layouts event pages commonly use.
///
/// Handles:
/// - ISO 8601 date-time: `"2026-02-15T20:00:00"`, with optional fraction,
///   without seconds, or with a space instead of `T`
/// - RFC 3339 with an offset: `"2026-02-15T20:00:00+02:00"` (the wall-clock
///   time is kept, the offset dropped)
/// - Date only: `"2026-02-15"`, `"15/02/2026"`, `"15-02-2026"` (midnight)
///
/// # Arguments
///
/// * `input` - Date string as the engine returned it; surrounding whitespace is ignored
///
/// # Returns
///
/// `None` for empty or unrecognized input. This never panics.
///
/// # Examples
///
/// ```ignore
/// assert!(parse_date("2026-02-15T20:00:00").is_some());
/// assert!(parse_date("not a date").is_none());
/// ```
pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Month range covering the next `days_ahead` days, for search queries.
///
/// # Arguments
///
/// * `today` - First day of the range, in the caller's timezone
/// * `days_ahead` - Length of the range in days
///
/// # Returns
///
/// `"February 2026"` when both ends fall in the same month, otherwise
/// `"February-March 2026"` (the year is the one of the later date).
#[instrument(level = "debug")]
pub fn date_range_query(today: NaiveDate, days_ahead: i64) -> String {
    let future = today + Duration::days(days_ahead);
    let range = if today.format("%Y-%m").to_string() == future.format("%Y-%m").to_string() {
        today.format("%B %Y").to_string()
    } else {
        format!("{}-{}", today.format("%B"), future.format("%B %Y"))
    };
    tracing::debug!(%today, %future, %range, "Computed search date range");
    range
}

/// Cut `s` to at most `max` characters without splitting a code point.
///
/// # Arguments
///
/// * `s` - Text to cut
/// * `max` - Limit in characters, not bytes
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at or before byte `max` (on a character boundary)
/// with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the engine's answer is cut off by its output token limit, the
/// JSON fails to parse with an EOF error rather than a syntax error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}
