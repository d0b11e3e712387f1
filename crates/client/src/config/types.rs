use marketfeed_core::{DEFAULT_SUBSCRIPTION, Topic};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::{ClientConfig, HistoryCapacities, ReconnectPolicy};

/// Root configuration file for the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfigFile {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Connect as soon as the client starts
    #[serde(default = "default_true")]
    pub auto_connect: bool,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    /// Topics to subscribe to
    #[serde(default = "default_topics")]
    pub topics: Vec<Topic>,
}

/// Where the feed lives
///
/// An explicit `url` wins; otherwise the endpoint is derived from the page
/// origin and `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub page_origin: Option<String>,
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            url: None,
            page_origin: None,
            path: default_path(),
        }
    }
}

/// Reconnect backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_base_interval")]
    pub base_interval_ms: u64,
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            enabled: true,
            base_interval_ms: default_base_interval(),
            max_interval_ms: default_max_interval(),
        }
    }
}

impl ReconnectConfig {
    pub fn to_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.enabled,
            base: Duration::from_millis(self.base_interval_ms),
            max: Duration::from_millis(self.max_interval_ms),
        }
    }
}

/// Keep-alive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub interval_ms: u64,
    /// Drop the link after this long without any frame; off when absent
    #[serde(default)]
    pub liveness_timeout_ms: Option<u64>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        HeartbeatConfig {
            interval_ms: default_heartbeat_interval(),
            liveness_timeout_ms: None,
        }
    }
}

/// Buffer capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_history")]
    pub max_indicators: usize,
    #[serde(default = "default_max_history")]
    pub max_bars: usize,
    #[serde(default = "default_max_history")]
    pub max_minute_bars: usize,
    #[serde(default = "default_max_predictions")]
    pub max_predictions: usize,
    #[serde(default = "default_max_history")]
    pub max_targets: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_indicators: default_max_history(),
            max_bars: default_max_history(),
            max_minute_bars: default_max_history(),
            max_predictions: default_max_predictions(),
            max_targets: default_max_history(),
        }
    }
}

impl HistoryConfig {
    pub fn to_capacities(&self) -> HistoryCapacities {
        HistoryCapacities {
            indicators: self.max_indicators,
            ohlcv: self.max_bars,
            minute_bars: self.max_minute_bars,
            predictions: self.max_predictions,
            targets: self.max_targets,
        }
    }
}

impl ClientConfigFile {
    /// Convert to the application-layer ClientConfig
    pub fn to_client_config(&self) -> Result<ClientConfig, super::ConfigError> {
        let endpoint = self.endpoint.resolve()?;
        Ok(ClientConfig::new(endpoint)
            .with_auto_connect(self.auto_connect)
            .with_reconnect(self.reconnect.to_policy())
            .with_heartbeat_interval(Duration::from_millis(self.heartbeat.interval_ms))
            .with_liveness_timeout(self.heartbeat.liveness_timeout_ms.map(Duration::from_millis))
            .with_capacities(self.history.to_capacities())
            .with_topics(self.topics.clone()))
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_path() -> String {
    "/api/market-data-ws".to_string()
}

fn default_base_interval() -> u64 {
    1000
}

fn default_max_interval() -> u64 {
    30000
}

fn default_heartbeat_interval() -> u64 {
    15000
}

fn default_max_history() -> usize {
    1000
}

fn default_max_predictions() -> usize {
    200
}

fn default_topics() -> Vec<Topic> {
    DEFAULT_SUBSCRIPTION.to_vec()
}
