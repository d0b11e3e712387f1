use serde::{Deserialize, Deserializer, Serialize};

use crate::time::{TimestampMs, deserialize_millis};

/// One evaluation of the indicator vector at a point in time.
///
/// `values[i]` belongs to the i-th feature name; the names travel either on
/// the record itself or through the client's feature-name cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(alias = "ts", alias = "ts_ms", deserialize_with = "deserialize_millis")]
    pub timestamp: TimestampMs,
    #[serde(default, deserialize_with = "nullable_values")]
    pub values: Vec<f64>,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(
        default,
        alias = "names",
        alias = "featureNames",
        skip_serializing_if = "Option::is_none"
    )]
    pub feature_names: Option<Vec<String>>,
    #[serde(default, alias = "featureHash", skip_serializing_if = "Option::is_none")]
    pub feature_hash: Option<String>,
}

fn default_valid() -> bool {
    true
}

/// Missing indicator values arrive as `null` while the lookback warms up
fn nullable_values<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

impl IndicatorSnapshot {
    pub fn new(timestamp: TimestampMs, values: Vec<f64>) -> Self {
        IndicatorSnapshot {
            timestamp,
            values,
            valid: true,
            feature_names: None,
            feature_hash: None,
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    /// Value at a position, `None` when out of range or not yet computed
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| !v.is_nan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let snap: IndicatorSnapshot = serde_json::from_str(
            r#"{"timestamp": 1000, "values": [1.0, 2.5], "valid": true}"#,
        )
        .unwrap();
        assert_eq!(snap.timestamp, 1000);
        assert_eq!(snap.values, vec![1.0, 2.5]);
        assert!(snap.feature_names.is_none());
    }

    #[test]
    fn test_stream_shape() {
        let snap: IndicatorSnapshot = serde_json::from_str(
            r#"{"ts": 2000, "names": ["ADX_L", "CMMA_S"], "values": [0.3, null], "feature_hash": "ab12"}"#,
        )
        .unwrap();
        assert_eq!(snap.timestamp, 2000);
        assert!(snap.valid);
        assert_eq!(snap.feature_names.as_deref().unwrap().len(), 2);
        assert_eq!(snap.feature_hash.as_deref(), Some("ab12"));
        assert_eq!(snap.value_at(0), Some(0.3));
        assert_eq!(snap.value_at(1), None);
        assert_eq!(snap.value_at(5), None);
    }

    #[test]
    fn test_valid_defaults_true() {
        let snap: IndicatorSnapshot = serde_json::from_str(r#"{"timestamp": 1}"#).unwrap();
        assert!(snap.valid);
        assert!(snap.values.is_empty());
    }
}
