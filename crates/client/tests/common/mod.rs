//! Shared fixtures for client integration tests
//!
//! `MockTransport` hands the server side of every opened link to the test,
//! so tests can play the feed deterministically under paused time.

#![allow(dead_code)]

use async_trait::async_trait;
use marketfeed_client::{
    ClientConfig, FeedTransport, MarketDataClient, TransportError, TransportLink,
    TransportMessage,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use url::Url;

// ============================================================================
// Mock transport
// ============================================================================

/// Server half of a mock link
pub struct ServerLink {
    pub from_client: mpsc::Receiver<String>,
    pub to_client: mpsc::Sender<TransportMessage>,
}

#[derive(Clone)]
pub struct MockTransport {
    links: mpsc::UnboundedSender<ServerLink>,
    failures_left: Arc<Mutex<usize>>,
    open_times: Arc<Mutex<Vec<Instant>>>,
}

impl MockTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerLink>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = MockTransport {
            links: tx,
            failures_left: Arc::new(Mutex::new(0)),
            open_times: Arc::new(Mutex::new(Vec::new())),
        };
        (transport, rx)
    }

    /// Refuse the next `n` open attempts
    pub fn fail_next(&self, n: usize) {
        *self.failures_left.lock() = n;
    }

    pub fn open_count(&self) -> usize {
        self.open_times.lock().len()
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.open_times.lock().clone()
    }
}

#[async_trait]
impl FeedTransport for MockTransport {
    async fn open(&self, _endpoint: &Url) -> Result<TransportLink, TransportError> {
        self.open_times.lock().push(Instant::now());
        {
            let mut failures = self.failures_left.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(TransportError::Connection("connection refused".into()));
            }
        }

        let (out_tx, out_rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(1024);
        let _ = self.links.send(ServerLink {
            from_client: out_rx,
            to_client: in_tx,
        });
        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

// ============================================================================
// Server-side helpers
// ============================================================================

impl ServerLink {
    pub async fn send_json(&self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn send_raw(&self, text: &str) {
        self.to_client
            .send(TransportMessage::Text(text.to_string()))
            .await
            .expect("client dropped the link");
    }

    pub async fn close(&self) {
        let _ = self
            .to_client
            .send(TransportMessage::Closed {
                reason: Some("server restart".into()),
            })
            .await;
    }

    /// Next frame from the client, pings included
    pub async fn next_message(&mut self) -> Option<Value> {
        let text = timeout(Duration::from_secs(120), self.from_client.recv())
            .await
            .expect("timed out waiting for a client frame")?;
        Some(serde_json::from_str(&text).expect("client sent invalid JSON"))
    }

    /// Next non-ping frame from the client
    pub async fn next_request(&mut self) -> Value {
        loop {
            let msg = self.next_message().await.expect("link closed by client");
            if msg["type"] != "ping" {
                return msg;
            }
        }
    }

    /// Everything the client sends before its next keep-alive ping
    pub async fn requests_until_ping(&mut self) -> Vec<Value> {
        let mut requests = Vec::new();
        loop {
            let msg = self.next_message().await.expect("link closed by client");
            if msg["type"] == "ping" {
                return requests;
            }
            requests.push(msg);
        }
    }

    pub async fn welcome(&self, client_id: &str) {
        self.send_json(json!({
            "type": "initial_data",
            "clientId": client_id,
            "tradingRules": {
                "positionSize": 1.0,
                "stopLoss": {"enabled": true, "useATR": true, "atrMultiplier": 2.0, "atrPeriod": 14}
            }
        }))
        .await;
    }

    pub async fn send_snapshots(&self) {
        for frame in snapshot_frames() {
            self.send_json(frame).await;
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn test_config() -> ClientConfig {
    let url = Url::parse("ws://feed.test/api/market-data-ws").expect("valid url");
    ClientConfig::new(url)
}

pub fn spawn_client(
    config: ClientConfig,
) -> (
    MarketDataClient,
    MockTransport,
    mpsc::UnboundedReceiver<ServerLink>,
) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (transport, links) = MockTransport::new();
    let client = MarketDataClient::spawn(config, transport.clone());
    (client, transport, links)
}

pub async fn next_link(links: &mut mpsc::UnboundedReceiver<ServerLink>) -> ServerLink {
    timeout(Duration::from_secs(300), links.recv())
        .await
        .expect("timed out waiting for the client to connect")
        .expect("transport dropped")
}

/// Poll until `check` holds, advancing (virtual) time in small steps
pub async fn eventually<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

pub fn bar(ts: i64, close: f64) -> Value {
    json!({
        "timestamp": ts,
        "open": close,
        "high": close + 1.0,
        "low": close - 1.0,
        "close": close,
        "volume": 10.0
    })
}

/// One `initial_data` frame per default topic
pub fn snapshot_frames() -> Vec<Value> {
    vec![
        json!({
            "type": "initial_data",
            "topic": "indicators",
            "data": {"snapshots": [
                {"timestamp": 1000, "values": [1.0, 2.0], "valid": true},
                {"timestamp": 2000, "values": [1.5, 2.5], "valid": true},
                {"timestamp": 3000, "values": [0.0, 0.0], "valid": false}
            ]}
        }),
        json!({
            "type": "initial_data",
            "topic": "ohlcv",
            "data": {"bars": [bar(1000, 100.0), bar(2000, 101.0)]}
        }),
        json!({
            "type": "initial_data",
            "topic": "atr",
            "data": {"current": {"timestamp": 2000, "value": 1.2, "stopLossLevel": 98.0, "takeProfitLevel": 103.0}}
        }),
        json!({
            "type": "initial_data",
            "topic": "position",
            "data": {"hasPosition": false}
        }),
        json!({
            "type": "initial_data",
            "topic": "performance",
            "data": {
                "totalTrades": 3, "winningTrades": 2, "losingTrades": 1, "winRate": 0.66,
                "totalPnl": 12.5, "averagePnl": 4.1, "maxDrawdown": 2.0, "sharpeRatio": 1.1
            }
        }),
    ]
}

pub fn request_types(requests: &[Value]) -> Vec<String> {
    requests
        .iter()
        .map(|r| r["type"].as_str().unwrap_or_default().to_string())
        .collect()
}
