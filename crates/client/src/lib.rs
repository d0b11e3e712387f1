//! Marketfeed Client
//!
//! Real-time market-data synchronization client. Keeps a bounded,
//! deduplicated in-memory view of indicator snapshots, OHLCV bars, ATR,
//! position and performance in sync with a push feed.
//!
//! # Architecture
//!
//! The client:
//! - Holds one WebSocket connection with keep-alive pings and exponential
//!   reconnect backoff
//! - Understands both the legacy stream format and the envelope protocol
//! - Requests the bulk snapshot once per session, then applies updates
//! - Exposes read-only views that never block on the connection
//!
//! ```text
//!                      ┌─────────────┐
//!                      │  Feed (WS)  │
//!                      └──────┬──────┘
//!                             │ text frames
//! ┌───────────────────────────▼──────────────────────────┐
//! │                 ConnectionManager                     │
//! │   (single task: link, heartbeat, backoff, commands)   │
//! │                                                       │
//! │  ┌─────────────────┐        ┌──────────────────────┐  │
//! │  │ ProtocolAdapter │───────▶│   StateReconciler    │  │
//! │  │ (gen A / gen B) │        │ (HistoryBuffers and  │  │
//! │  └─────────────────┘        │  latest-value slots) │  │
//! │  ┌─────────────────┐        └──────────┬───────────┘  │
//! │  │  Subscription   │                   │              │
//! │  │    Registry     │                   │              │
//! │  └─────────────────┘                   │              │
//! └────────────────────────────────────────┼──────────────┘
//!                                          │ FeedView
//!                                          ▼
//!                                ┌───────────────────┐
//!                                │ MarketDataClient  │
//!                                └───────────────────┘
//! ```

pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export key types
pub use client::MarketDataClient;
pub use error::{ClientError, FrameError, TransportError};

pub use domain::{
    Availability, ClientRequest, ConnectionState, ConnectionStatus, FeedEvent, FeedNotice,
    FeedTransport, Frame, TopicData, TransportLink, TransportMessage,
};

pub use application::{
    ClientConfig, FeedState, FeedView, HistoryCapacities, ProtocolAdapter, ReconnectPolicy,
    StateReconciler, SubscriptionRegistry,
};

pub use infrastructure::{WsTransport, parse_endpoint, resolve_endpoint};

pub use config::{ClientConfigFile, ConfigError, load_config, load_default_config};

pub use marketfeed_core::{DEFAULT_SUBSCRIPTION, Topic};
