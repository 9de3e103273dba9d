// src/ingest/parse.rs
//! Cell-level parsers shared by the CSV loaders.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Export format of the survey platform, e.g. `May 22, 2025 at 3:04 PM (GMT)`.
pub const PLATFORM_TIMESTAMP_FORMAT: &str = "%B %d, %Y at %I:%M %p (GMT)";

const FALLBACK_NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a timestamp cell. Returns `None` for blank or unparseable input.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, PLATFORM_TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    FALLBACK_NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Convert an agreement cell to a fraction.
///
/// `"73%"` → 0.73, `"0.73"` → 0.73, `"73"` → 0.73 (bare numbers above 1 are percentages),
/// `"-"`/blank/garbage → `None`.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let value = if let Some(num) = s.strip_suffix('%') {
        num.trim().parse::<f64>().ok()? / 100.0
    } else {
        let v = s.parse::<f64>().ok()?;
        if v > 1.0 {
            v / 100.0
        } else {
            v
        }
    };
    value.is_finite().then_some(value)
}

/// Blank cells become `None`; everything else is trimmed.
pub fn non_empty(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_string())
}
