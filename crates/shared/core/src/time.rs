use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Milliseconds since the Unix epoch, as carried on the wire
pub type TimestampMs = i64;

/// Convert a wire timestamp into a UTC datetime
pub fn to_datetime(ts: TimestampMs) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts)
}

/// Accept integral or fractional millisecond timestamps.
///
/// Some producers serialize epoch millis as floats (`1.7e12`); they are
/// truncated toward zero.
pub fn deserialize_millis<'de, D>(deserializer: D) -> Result<TimestampMs, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Int(i64),
        Float(f64),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Int(v) => Ok(v),
        Millis::Float(v) if v.is_finite() => Ok(v as i64),
        Millis::Float(v) => Err(serde::de::Error::custom(format!(
            "timestamp is not finite: {v}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(deserialize_with = "deserialize_millis")]
        ts: TimestampMs,
    }

    #[test]
    fn test_integer_and_float_millis() {
        let a: Stamped = serde_json::from_str(r#"{"ts": 1700000000000}"#).unwrap();
        let b: Stamped = serde_json::from_str(r#"{"ts": 1700000000000.0}"#).unwrap();
        assert_eq!(a.ts, b.ts);
    }

    #[test]
    fn test_to_datetime() {
        let dt = to_datetime(0).unwrap();
        assert_eq!(dt.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }
}
