//! Timestamp utilities
//!
//! Stored timestamps are fixed-width RFC 3339 UTC text so that SQLite string
//! comparison orders them chronologically.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

use crate::{Error, Result};

/// Current UTC timestamp at storage precision (microseconds)
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp for storage (`YYYY-MM-DDTHH:MM:SS.ffffffZ`)
pub fn to_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp previously written by [`to_storage`]
pub fn from_storage(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt stored timestamp '{}': {}", value, e)))
}

/// Smallest storage-precision timestamp not earlier than `ts`
///
/// Used for inclusive lower bounds: truncating instead would admit records
/// created up to a microsecond before the bound.
pub fn ceil_to_storage(ts: &DateTime<Utc>) -> DateTime<Utc> {
    let truncated = ts.trunc_subsecs(6);
    if truncated < *ts {
        truncated + Duration::microseconds(1)
    } else {
        truncated
    }
}

/// Parse a user-supplied ISO-8601 timestamp used as a query bound
///
/// Accepts RFC 3339 with `Z` or an offset, a naive date-time (taken as UTC)
/// or a bare date (midnight UTC).
pub fn parse_filter_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(Error::InvalidFilter(format!(
        "{} must be an ISO-8601 timestamp, got '{}'",
        field, value
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
        // Survives a storage round trip unchanged
        assert_eq!(from_storage(&to_storage(&timestamp)).unwrap(), timestamp);
    }

    #[test]
    fn test_storage_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap();
        let b = a + chrono::Duration::microseconds(123_456);
        assert_eq!(to_storage(&a), "2026-01-04T12:00:00.000000Z");
        assert_eq!(to_storage(&b), "2026-01-04T12:00:00.123456Z");
        assert_eq!(to_storage(&a).len(), to_storage(&b).len());
        assert!(to_storage(&a) < to_storage(&b));
    }

    #[test]
    fn test_storage_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(from_storage(&to_storage(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_ceil_to_storage() {
        let whole = Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap() + Duration::microseconds(7);
        assert_eq!(ceil_to_storage(&whole), whole);

        let between = whole + Duration::nanoseconds(1);
        assert_eq!(ceil_to_storage(&between), whole + Duration::microseconds(1));
        assert_eq!(to_storage(&ceil_to_storage(&between)), "2026-01-04T12:00:00.000008Z");
    }

    #[test]
    fn test_parse_rfc3339_with_z() {
        let ts = parse_filter_timestamp("created_after", "2026-01-04T12:34:56Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 1, 4, 12, 34, 56).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_filter_timestamp("created_after", "2026-01-04T14:34:56+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 1, 4, 12, 34, 56).unwrap());
    }

    #[test]
    fn test_parse_naive_datetime_as_utc() {
        let ts = parse_filter_timestamp("created_before", "2026-01-04T12:34:56").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 1, 4, 12, 34, 56).unwrap());
    }

    #[test]
    fn test_parse_bare_date_as_midnight() {
        let ts = parse_filter_timestamp("created_after", "2026-01-04").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 1, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_garbage_is_invalid_filter() {
        let err = parse_filter_timestamp("created_after", "yesterday").unwrap_err();
        match err {
            Error::InvalidFilter(msg) => assert!(msg.contains("created_after")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
