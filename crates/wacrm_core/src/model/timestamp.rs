//! Record timestamps.
//!
//! Timestamps persist as RFC 3339 UTC strings with fixed microsecond
//! precision, so stored text compares lexicographically in time order and
//! round-trips without loss.

use chrono::{DateTime, Duration, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Timestamp type carried by every record.
pub type Timestamp = DateTime<Utc>;

/// Returns the current time truncated to storage precision.
pub fn now() -> Timestamp {
    truncate(Utc::now())
}

/// Drops sub-microsecond precision.
pub fn truncate(value: Timestamp) -> Timestamp {
    let nanos = value.nanosecond() / 1_000 * 1_000;
    value.with_nanosecond(nanos).unwrap_or(value)
}

/// Returns the version stamp for the next write after `previous`.
///
/// Always strictly greater than `previous`, even when the wall clock is
/// behind or has not advanced.
pub fn next_version(previous: Timestamp) -> Timestamp {
    let candidate = now();
    if candidate > previous {
        candidate
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Formats a timestamp in persisted form.
pub fn format(value: &Timestamp) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a persisted timestamp.
pub fn parse(value: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|parsed| truncate(parsed.with_timezone(&Utc)))
}

pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse(&text).map_err(serde::de::Error::custom)
}

/// Serde adapter for optional timestamps.
pub mod option {
    use super::Timestamp;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&super::format(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| super::parse(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::{format, next_version, parse, truncate};
    use chrono::{TimeZone, Utc};

    #[test]
    fn format_uses_fixed_micro_precision() {
        let value = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(format(&value), "2026-03-01T09:30:00.000000Z");
    }

    #[test]
    fn parse_accepts_offsets_and_normalizes_to_utc() {
        let parsed = parse("2026-03-01T11:30:00.5+02:00").unwrap();
        assert_eq!(format(&parsed), "2026-03-01T09:30:00.500000Z");
    }

    #[test]
    fn next_version_is_strictly_greater_than_future_previous() {
        let future = truncate(Utc::now() + chrono::Duration::hours(1));
        let next = next_version(future);
        assert!(next > future);
        assert_eq!(next - future, chrono::Duration::microseconds(1));
    }
}
