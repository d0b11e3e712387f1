//! Error types for the client crate

use marketfeed_core::Topic;
use thiserror::Error;

/// Transport-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::Connection(e.to_string())
    }
}

/// Errors raised while turning an inbound frame into an event
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to parse message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid {topic} payload: {source}")]
    Payload {
        topic: Topic,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing {topic} payload")]
    MissingPayload { topic: Topic },
}

/// Client-level errors (facade operations)
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Client has shut down")]
    ChannelClosed,

    #[error("Controller task failed: {0}")]
    Task(String),
}
