use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::TransportError;

/// Message delivered by a transport link, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMessage {
    Text(String),
    /// The peer closed the link
    Closed { reason: Option<String> },
    /// The link failed; no further messages follow
    Failed(String),
}

/// An open link to the feed.
///
/// Dropping `outbound` asks the transport to close the link.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<TransportMessage>,
}

/// Trait for opening push connections to the feed
///
/// The connection manager only sees text frames through this seam, so it
/// carries no knowledge of sockets or of the wire protocol.
#[async_trait]
pub trait FeedTransport: Send + Sync + 'static {
    async fn open(&self, endpoint: &Url) -> Result<TransportLink, TransportError>;
}
