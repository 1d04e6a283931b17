//! Proptest generators for property-based testing.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use proptest::prelude::*;

use keri_db_core::{to_iso8601, Ordinal};

/// Generate a qualified identifier prefix: a derivation code then 43
/// Base64URL characters. Never contains `.` or `|`.
pub fn prefix() -> impl Strategy<Value = String> {
    "[BDE][A-Za-z0-9_-]{43}"
}

/// Generate a qualified Blake3 digest.
pub fn digest() -> impl Strategy<Value = String> {
    "E[A-Za-z0-9_-]{43}"
}

/// Generate a sequence number or ordinal over the full range.
pub fn sn() -> impl Strategy<Value = Ordinal> {
    prop_oneof![
        0..1024u128,
        any::<Ordinal>(),
        Just(Ordinal::MAX),
    ]
}

/// Generate a datetime with microsecond precision and a whole-minute
/// offset, between 1970 and 2100.
pub fn datetime() -> impl Strategy<Value = DateTime<FixedOffset>> {
    (0i64..4_102_444_800, 0u32..1_000_000, -720i32..=720).prop_map(|(secs, micros, mins)| {
        let offset = FixedOffset::east_opt(mins * 60).unwrap_or_else(|| Utc.fix());
        let utc = Utc
            .timestamp_opt(secs, micros * 1_000)
            .single()
            .unwrap_or_default();
        utc.with_timezone(&offset)
    })
}

/// Generate an ISO-8601 timestamp string as stored in `dtss`.
pub fn dts() -> impl Strategy<Value = String> {
    datetime().prop_map(|dt| to_iso8601(&dt))
}

/// Generate a set of duplicate values for one key.
pub fn values(max: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..=48), 1..=max)
}
