use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named stream of records published by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Indicators,
    Ohlcv,
    Atr,
    Position,
    Performance,
    /// One-minute bars, only published by the legacy stream format
    #[serde(rename = "minute")]
    MinuteBars,
    /// Model predictions, only published by the legacy stream format
    #[serde(rename = "prediction", alias = "predictions")]
    Predictions,
    /// Realized model targets, keyed by model and bar
    #[serde(rename = "target", alias = "targets")]
    Targets,
}

/// Topics a fresh client subscribes to
pub const DEFAULT_SUBSCRIPTION: [Topic; 5] = [
    Topic::Indicators,
    Topic::Ohlcv,
    Topic::Atr,
    Topic::Position,
    Topic::Performance,
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown topic: {0}")]
pub struct TopicParseError(pub String);

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Indicators => "indicators",
            Topic::Ohlcv => "ohlcv",
            Topic::Atr => "atr",
            Topic::Position => "position",
            Topic::Performance => "performance",
            Topic::MinuteBars => "minute",
            Topic::Predictions => "prediction",
            Topic::Targets => "target",
        }
    }

    /// Map a legacy stream channel name onto a topic.
    ///
    /// The legacy format names its hourly bar channel `hour`; everything
    /// else shares the canonical names.
    pub fn from_stream_channel(channel: &str) -> Option<Topic> {
        match channel {
            "hour" => Some(Topic::Ohlcv),
            other => other.parse().ok(),
        }
    }
}

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indicators" => Ok(Topic::Indicators),
            "ohlcv" => Ok(Topic::Ohlcv),
            "atr" => Ok(Topic::Atr),
            "position" => Ok(Topic::Position),
            "performance" => Ok(Topic::Performance),
            "minute" => Ok(Topic::MinuteBars),
            "prediction" | "predictions" => Ok(Topic::Predictions),
            "target" | "targets" => Ok(Topic::Targets),
            other => Err(TopicParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
