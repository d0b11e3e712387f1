use serde::{Deserialize, Serialize};

/// Exit and sizing rules the strategy runner is trading with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradingRules {
    pub position_size: f64,
    pub exit_strength_pct: f64,
    pub honor_signal_reversal: bool,
    pub use_signal_exit: bool,
    pub stop_loss: StopLossRule,
    pub take_profit: TakeProfitRule,
    pub time_exit: TimeExitRule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopLossRule {
    pub enabled: bool,
    #[serde(rename = "useATR")]
    pub use_atr: bool,
    pub fixed_pct: f64,
    pub atr_multiplier: f64,
    pub atr_period: u32,
    pub cooldown_bars: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TakeProfitRule {
    pub enabled: bool,
    #[serde(rename = "useATR")]
    pub use_atr: bool,
    pub fixed_pct: f64,
    pub atr_multiplier: f64,
    pub atr_period: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeExitRule {
    pub enabled: bool,
    pub max_holding_bars: u32,
}
