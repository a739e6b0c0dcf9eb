//! Value normalization service
//!
//! Providers report timestamps and decimals in a handful of loosely
//! specified textual forms. These helpers turn them into canonical values
//! so adapters can share one set of parsing rules.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a decimal that may be stored as text.
///
/// Accepts surrounding whitespace and a thousands separator comma when a
/// decimal point is also present ("1,234.5"). Non-finite values are rejected.
///
/// # Examples
/// ```
/// use suntrack::services::normalizer::parse_decimal;
///
/// assert_eq!(parse_decimal(" 12.50 "), Some(12.5));
/// assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
/// assert_eq!(parse_decimal("--"), None);
/// ```
pub fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned;
    let candidate = if trimmed.contains(',') && trimmed.contains('.') {
        cleaned = trimmed.replace(',', "");
        cleaned.as_str()
    } else {
        trimmed
    };

    candidate.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a provider timestamp into UTC.
///
/// Accepted forms, in order:
/// - RFC 3339 with offset: "2024-03-20T08:15:00+01:00", "2024-04-01T00:00:00Z"
/// - Naive date-time (treated as UTC): "2024-03-20 08:15:00", "2024-03-20T08:15:00"
/// - Plain date (midnight UTC): "2024-03-20"
/// - Epoch milliseconds as digits: "1711526400000"
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    if trimmed.len() >= 12 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.parse::<i64>().ok().and_then(from_epoch_millis);
    }

    None
}

/// Convert epoch milliseconds to UTC; None when out of range or non-positive
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}

/// Alarm severity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Other,
}

/// Classify a provider severity label (case-insensitive)
pub fn classify_severity(label: &str) -> Severity {
    match label.trim().to_ascii_lowercase().as_str() {
        "critical" => Severity::Critical,
        "warning" => Severity::Warning,
        _ => Severity::Other,
    }
}

/// Whether an alarm status label denotes an active alarm
pub fn is_active_status(label: &str) -> bool {
    label.trim().eq_ignore_ascii_case("active")
}
