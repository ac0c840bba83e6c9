//! Timestamp normalization at the store boundary.
//!
//! Records arrive with timestamps in whatever shape the exporter produced:
//! RFC 3339 strings, bare `YYYY-MM-DD` dates, epoch milliseconds, or
//! Firestore-style `{ "_seconds", "_nanoseconds" }` objects. This module is
//! the only place those shapes are interpreted; everything past it sees
//! `DateTime<Utc>`.
//!
//! Use as `#[serde(with = "crate::store::timestamp")]` for required fields
//! and `#[serde(default, with = "crate::store::timestamp::option")]` for
//! optional ones.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Parse a timestamp string.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` without offset (taken as
/// UTC), and bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalize any supported JSON timestamp representation.
pub fn from_json(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_str(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::Object(map) => {
            let seconds = map
                .get("_seconds")
                .or_else(|| map.get("seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("_nanoseconds")
                .or_else(|| map.get("nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?)
                .single()
        }
        _ => None,
    }
}

/// Canonical storage form: RFC 3339 with millisecond precision and `Z`.
pub fn to_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_storage(ts))
}

pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    from_json(&value).ok_or_else(|| de::Error::custom(format!("unrecognized timestamp: {value}")))
}

/// Optional timestamps. Null, missing and unrecognized values all become
/// `None`; a record with a garbled optional timestamp is still usable.
pub mod option {
    use super::*;

    pub fn serialize<S>(
        ts: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_str(&to_storage(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(value) => {
                let parsed = from_json(&value);
                if parsed.is_none() {
                    tracing::debug!(%value, "Ignoring unrecognized optional timestamp");
                }
                parsed
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_str("2025-04-21T08:45:00+02:00").unwrap();
        assert_eq!(to_storage(&ts), "2025-04-21T06:45:00.000Z");
    }

    #[test]
    fn test_parse_bare_date_is_midnight_utc() {
        let ts = parse_str("2025-04-21").unwrap();
        assert_eq!(to_storage(&ts), "2025-04-21T00:00:00.000Z");
    }

    #[test]
    fn test_parse_naive_datetime() {
        let ts = parse_str("2025-04-21T13:05:09.250").unwrap();
        assert_eq!(to_storage(&ts), "2025-04-21T13:05:09.250Z");
    }

    #[test]
    fn test_firestore_object() {
        let ts = from_json(&json!({"_seconds": 1745225100, "_nanoseconds": 0})).unwrap();
        assert_eq!(to_storage(&ts), "2025-04-21T08:45:00.000Z");

        let ts = from_json(&json!({"seconds": 1745225100})).unwrap();
        assert_eq!(to_storage(&ts), "2025-04-21T08:45:00.000Z");
    }

    #[test]
    fn test_epoch_millis() {
        let ts = from_json(&json!(1745225100000_i64)).unwrap();
        assert_eq!(to_storage(&ts), "2025-04-21T08:45:00.000Z");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_str("not a date").is_none());
        assert!(parse_str("2025-13-40").is_none());
        assert!(from_json(&json!(true)).is_none());
        assert!(from_json(&json!({"foo": 1})).is_none());
    }
}
