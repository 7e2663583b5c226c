//! Date and time helpers for SCIM dateTime values

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Formats a DateTime to SCIM 2.0 compliant XSD dateTime format
///
/// SCIM 2.0 (RFC 7643 section 2.3.5) uses the XML Schema dateTime format.
/// Timestamps are written in UTC with millisecond precision, which is also
/// how date operands of a filter are rendered.
///
/// Example output: "2025-06-14T10:03:54.374Z"
pub fn format_scim_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parses an xsd:dateTime string.
///
/// Accepts RFC 3339 text with a `Z` or numeric offset. A value without any
/// zone designator is taken to be UTC. Returns `None` for anything else, so
/// callers can fall back to comparing the text itself.
pub fn parse_scim_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}
