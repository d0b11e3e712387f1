use serde::{Deserialize, Serialize};

use crate::time::{TimestampMs, deserialize_millis};

/// Model id used for targets published without one
pub const DEFAULT_TARGET_MODEL: &str = "active";

/// Realized target value for one bar
///
/// Targets are model-agnostic on the stream format, so `model_id` is often
/// absent. The value is null until the horizon has matured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(alias = "ts_ms", deserialize_with = "deserialize_millis")]
    pub ts: TimestampMs,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_bars: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matured_at: Option<TimestampMs>,
}

/// Targets are unique per model and bar
pub type TargetKey = (String, TimestampMs);

impl TargetValue {
    pub fn key(&self) -> TargetKey {
        let model = self.model_id.as_deref().unwrap_or(DEFAULT_TARGET_MODEL);
        (model.to_string(), self.ts)
    }
}
