use marketfeed_core::{DEFAULT_SUBSCRIPTION, Topic};
use std::time::Duration;
use url::Url;

use super::backoff::ReconnectPolicy;

/// Retained record counts per buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCapacities {
    pub indicators: usize,
    pub ohlcv: usize,
    pub minute_bars: usize,
    pub predictions: usize,
    pub targets: usize,
}

impl Default for HistoryCapacities {
    fn default() -> Self {
        HistoryCapacities {
            indicators: 1000,
            ohlcv: 1000,
            minute_bars: 1000,
            predictions: 200,
            targets: 1000,
        }
    }
}

impl HistoryCapacities {
    pub fn uniform(capacity: usize) -> Self {
        HistoryCapacities {
            indicators: capacity,
            ohlcv: capacity,
            minute_bars: capacity,
            predictions: capacity,
            targets: capacity,
        }
    }
}

/// Runtime configuration for the synchronization client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Fully resolved `ws://` or `wss://` endpoint
    pub endpoint: Url,
    /// Connect as soon as the client is spawned
    pub auto_connect: bool,
    pub reconnect: ReconnectPolicy,
    /// Interval between keep-alive pings while open
    pub heartbeat_interval: Duration,
    /// Close the link if no frame arrives for this long
    pub liveness_timeout: Option<Duration>,
    pub capacities: HistoryCapacities,
    /// Topics subscribed on every (re)connect
    pub topics: Vec<Topic>,
}

impl ClientConfig {
    pub fn new(endpoint: Url) -> Self {
        ClientConfig {
            endpoint,
            auto_connect: true,
            reconnect: ReconnectPolicy::default(),
            heartbeat_interval: Duration::from_millis(15_000),
            liveness_timeout: None,
            capacities: HistoryCapacities::default(),
            topics: DEFAULT_SUBSCRIPTION.to_vec(),
        }
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_liveness_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    pub fn with_capacities(mut self, capacities: HistoryCapacities) -> Self {
        self.capacities = capacities;
        self
    }

    pub fn with_topics(mut self, topics: Vec<Topic>) -> Self {
        self.topics = topics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let url = Url::parse("ws://localhost:3000/api/market-data-ws").unwrap();
        let config = ClientConfig::new(url);
        assert!(config.auto_connect);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.capacities.indicators, 1000);
        assert_eq!(config.capacities.predictions, 200);
        assert_eq!(config.topics.len(), 5);
        assert!(config.liveness_timeout.is_none());
    }

    #[test]
    fn test_builders() {
        let url = Url::parse("ws://localhost/ws").unwrap();
        let config = ClientConfig::new(url)
            .with_auto_connect(false)
            .with_capacities(HistoryCapacities::uniform(3))
            .with_topics(vec![Topic::Ohlcv]);
        assert!(!config.auto_connect);
        assert_eq!(config.capacities.ohlcv, 3);
        assert_eq!(config.topics, vec![Topic::Ohlcv]);
    }
}
