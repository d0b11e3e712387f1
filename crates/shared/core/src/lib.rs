//! Marketfeed Core Domain
//!
//! Pure domain types for the market-data synchronization client.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod features;
pub mod history;
pub mod records;
pub mod time;
pub mod topic;

// Re-export commonly used types at crate root
pub use features::{DEFAULT_FEATURE_NAMES, FeatureNames};
pub use history::{HistoryBuffer, Keyed};
pub use records::{
    AtrData, DEFAULT_TARGET_MODEL, IndicatorSnapshot, OhlcvBar, PerformanceData, PositionData,
    PositionSide, Prediction, PredictionKey, SessionInfo, StopLossRule, TakeProfitRule, TargetKey,
    TargetValue, TimeExitRule, TradingRules,
};
pub use time::{TimestampMs, to_datetime};
pub use topic::{DEFAULT_SUBSCRIPTION, Topic, TopicParseError};
