use serde::{Deserialize, Serialize};

use crate::time::{TimestampMs, deserialize_millis};

/// Current ATR reading with the derived exit levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtrData {
    #[serde(alias = "ts", deserialize_with = "deserialize_millis")]
    pub timestamp: TimestampMs,
    pub value: f64,
    #[serde(default, alias = "stop_loss_level")]
    pub stop_loss_level: f64,
    #[serde(default, alias = "take_profit_level")]
    pub take_profit_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

/// Open position as reported by the strategy runner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    #[serde(default, alias = "has_position")]
    pub has_position: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<PositionSide>,
    #[serde(default, alias = "entry_price", skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    #[serde(default, alias = "entry_timestamp", skip_serializing_if = "Option::is_none")]
    pub entry_timestamp: Option<TimestampMs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, alias = "unrealized_pnl", skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<f64>,
    #[serde(default, alias = "stop_loss", skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, alias = "take_profit", skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
}

impl PositionData {
    pub fn flat() -> Self {
        PositionData::default()
    }

    pub fn is_long(&self) -> bool {
        self.has_position && self.side == Some(PositionSide::Long)
    }

    pub fn is_short(&self) -> bool {
        self.has_position && self.side == Some(PositionSide::Short)
    }
}

/// Running performance statistics.
///
/// The legacy stream publishes model-evaluation scalars instead of trade
/// statistics; anything not named here is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    #[serde(default, alias = "total_trades")]
    pub total_trades: u64,
    #[serde(default, alias = "winning_trades")]
    pub winning_trades: u64,
    #[serde(default, alias = "losing_trades")]
    pub losing_trades: u64,
    #[serde(default, alias = "win_rate")]
    pub win_rate: f64,
    #[serde(default, alias = "total_pnl")]
    pub total_pnl: f64,
    #[serde(default, alias = "average_pnl")]
    pub average_pnl: f64,
    #[serde(default, alias = "max_drawdown")]
    pub max_drawdown: f64,
    #[serde(default, alias = "sharpe_ratio")]
    pub sharpe_ratio: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PerformanceData {
    /// Numeric value of an unnamed metric
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.extra.get(name).and_then(|v| v.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atr_camel_case() {
        let atr: AtrData = serde_json::from_str(
            r#"{"timestamp": 5, "value": 1.25, "stopLossLevel": 99.0, "takeProfitLevel": 104.5}"#,
        )
        .unwrap();
        assert_eq!(atr.stop_loss_level, 99.0);
        assert_eq!(atr.take_profit_level, 104.5);
    }

    #[test]
    fn test_position_optional_fields() {
        let pos: PositionData = serde_json::from_str(r#"{"hasPosition": false}"#).unwrap();
        assert_eq!(pos, PositionData::flat());

        let pos: PositionData = serde_json::from_str(
            r#"{"hasPosition": true, "side": "short", "entryPrice": 101.0, "size": 2}"#,
        )
        .unwrap();
        assert!(pos.is_short());
        assert!(!pos.is_long());
        assert_eq!(pos.entry_price, Some(101.0));
    }

    #[test]
    fn test_performance_keeps_model_metrics() {
        let perf: PerformanceData = serde_json::from_str(
            r#"{"topic": "performance", "ic": 0.041, "hit_rate": 0.53, "n": 480}"#,
        )
        .unwrap();
        assert_eq!(perf.total_trades, 0);
        assert_eq!(perf.metric("ic"), Some(0.041));
        assert_eq!(perf.metric("n"), Some(480.0));
    }

    #[test]
    fn test_performance_trade_stats() {
        let perf: PerformanceData = serde_json::from_str(
            r#"{"totalTrades": 10, "winningTrades": 6, "losingTrades": 4, "winRate": 0.6, "sharpeRatio": 1.4}"#,
        )
        .unwrap();
        assert_eq!(perf.total_trades, 10);
        assert_eq!(perf.win_rate, 0.6);
        assert!(perf.extra.is_empty());
    }
}
