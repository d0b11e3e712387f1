//! Record types carried by the feed.
//!
//! Field names follow the wire format; both the camelCase names of the
//! envelope protocol and the snake_case names of the legacy stream are
//! accepted where they differ.

mod account;
mod bar;
mod indicator;
mod prediction;
mod rules;
mod session;
mod target;

pub use account::{AtrData, PerformanceData, PositionData, PositionSide};
pub use bar::OhlcvBar;
pub use indicator::IndicatorSnapshot;
pub use prediction::{Prediction, PredictionKey};
pub use rules::{StopLossRule, TakeProfitRule, TimeExitRule, TradingRules};
pub use session::SessionInfo;
pub use target::{DEFAULT_TARGET_MODEL, TargetKey, TargetValue};
