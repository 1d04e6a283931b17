//! ISO-8601 helpers for first-seen timestamps and datetime keys.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use crate::error::Result;

/// Current UTC time as ISO-8601 with microseconds, e.g.
/// `2021-02-13T19:16:50.750302+00:00`.
pub fn now_iso8601() -> String {
    let now: DateTime<FixedOffset> = Utc::now().into();
    to_iso8601(&now)
}

/// Format a datetime the way timestamps are stored.
pub fn to_iso8601(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse a stored ISO-8601 timestamp.
pub fn from_iso8601(dts: &str) -> Result<DateTime<FixedOffset>> {
    Ok(DateTime::parse_from_rfc3339(dts)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso8601_roundtrip() {
        let dts = "2021-02-13T19:16:50.750302+00:00";
        let dt = from_iso8601(dts).unwrap();
        assert_eq!(to_iso8601(&dt), dts);
    }

    #[test]
    fn test_now_is_parseable() {
        let now = now_iso8601();
        assert!(now.ends_with("+00:00"));
        assert!(from_iso8601(&now).is_ok());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(from_iso8601("yesterday").is_err());
    }
}
