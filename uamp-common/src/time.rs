//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, Utc};

/// Display format: short US date with medium time, e.g. `3/14/24, 9:26:53 AM`
const DISPLAY_FORMAT: &str = "%-m/%-d/%y, %-I:%M:%S %p";

/// Parse a gateway timestamp (RFC 3339, or ISO-8601 without offset as UTC)
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(ts) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a receipt timestamp for display
///
/// Unparsable input is returned unchanged so that rendering never fails.
///
/// # Examples
///
/// ```
/// use uamp_common::time::format_timestamp;
///
/// assert_eq!(format_timestamp("2024-03-14T09:26:53Z"), "3/14/24, 9:26:53 AM");
/// assert_eq!(format_timestamp("not a time"), "not a time");
/// ```
pub fn format_timestamp(ts: &str) -> String {
    match parse_timestamp(ts) {
        Some(parsed) => parsed.format(DISPLAY_FORMAT).to_string(),
        None => ts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_utc_timestamp() {
        assert_eq!(format_timestamp("2024-11-02T17:05:09Z"), "11/2/24, 5:05:09 PM");
    }

    #[test]
    fn test_format_converts_offset_to_utc() {
        assert_eq!(
            format_timestamp("2024-01-01T10:00:00+10:00"),
            "1/1/24, 12:00:00 AM"
        );
    }

    #[test]
    fn test_format_fractional_seconds_without_offset() {
        assert_eq!(
            format_timestamp("2024-06-30T23:59:59.123456"),
            "6/30/24, 11:59:59 PM"
        );
    }

    #[test]
    fn test_unparsable_passes_through() {
        assert_eq!(format_timestamp(""), "");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_parse_timestamp_none_on_garbage() {
        assert!(parse_timestamp("2024-13-45T00:00:00Z").is_none());
    }
}
