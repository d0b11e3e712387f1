use serde::{Deserialize, Serialize};

use super::TradingRules;

/// Session details announced by the server's welcome frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub client_id: String,
    pub trading_rules: Option<TradingRules>,
}
