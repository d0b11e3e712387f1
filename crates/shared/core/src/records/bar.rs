use serde::{Deserialize, Serialize};

use crate::time::{TimestampMs, deserialize_millis};

/// OHLCV bar keyed by its start time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    #[serde(alias = "ts", alias = "ts_ms", deserialize_with = "deserialize_millis")]
    pub timestamp: TimestampMs,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    /// Backfilled or interpolated rather than observed
    #[serde(default)]
    pub synthetic: bool,
}

impl OhlcvBar {
    pub fn new(timestamp: TimestampMs, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        OhlcvBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            synthetic: false,
        }
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_frame_fields() {
        let bar: OhlcvBar = serde_json::from_str(
            r#"{"topic": "hour", "ts": 3600000, "open": 10, "high": 12, "low": 9, "close": 11, "synthetic": true}"#,
        )
        .unwrap();
        assert_eq!(bar.timestamp, 3_600_000);
        assert_eq!(bar.volume, 0.0);
        assert!(bar.synthetic);
        assert_eq!(bar.range(), 3.0);
    }
}
