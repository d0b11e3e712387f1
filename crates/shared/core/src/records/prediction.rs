use serde::{Deserialize, Serialize};

use crate::time::{TimestampMs, deserialize_millis};

/// Model output for one bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub model_id: String,
    #[serde(alias = "ts_ms", deserialize_with = "deserialize_millis")]
    pub ts: TimestampMs,
    pub prediction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_hash: Option<String>,
    /// Realized target, when the feed reports it alongside the prediction
    #[serde(default, alias = "target", skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
}

/// Predictions are unique per model and bar
pub type PredictionKey = (String, TimestampMs);

impl Prediction {
    pub fn key(&self) -> PredictionKey {
        (self.model_id.clone(), self.ts)
    }

    /// Signal direction implied by the thresholds, if both are known
    pub fn signal(&self) -> Option<i8> {
        let (long, short) = (self.long_threshold?, self.short_threshold?);
        if self.prediction >= long {
            Some(1)
        } else if self.prediction <= short {
            Some(-1)
        } else {
            Some(0)
        }
    }
}
