use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::domain::{FeedTransport, TransportLink, TransportMessage};
use crate::error::TransportError;

/// WebSocket transport for the feed
/// Infrastructure component - handles WebSocket communication
#[derive(Debug, Clone)]
pub struct WsTransport {
    outbound_capacity: usize,
    inbound_capacity: usize,
}

impl Default for WsTransport {
    fn default() -> Self {
        WsTransport {
            outbound_capacity: 64,
            inbound_capacity: 1024,
        }
    }
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

/// rustls 0.23 needs a process-wide crypto provider before the first
/// `wss://` handshake. Installing twice is harmless.
fn install_crypto_provider() {
    let _ = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::ring::default_provider(),
    );
}

#[async_trait]
impl FeedTransport for WsTransport {
    async fn open(&self, endpoint: &Url) -> Result<TransportLink, TransportError> {
        if endpoint.scheme() == "wss" {
            install_crypto_provider();
        }
        let (ws_stream, _) = connect_async(endpoint.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        // Frames queued by the controller
        let (out_tx, mut out_rx) = mpsc::channel::<String>(self.outbound_capacity);

        // Frames delivered to the controller
        let (in_tx, in_rx) = mpsc::channel::<TransportMessage>(self.inbound_capacity);

        // Spawn task to handle outgoing messages
        let failure_tx = in_tx.clone();
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    let _ = failure_tx.send(TransportMessage::Failed(e.to_string())).await;
                    return;
                }
            }
            // Controller dropped the link
            debug!("Outbound channel closed, closing socket");
            let _ = write.send(Message::Close(None)).await;
            let _ = write.close().await;
        });

        // Spawn task to handle incoming messages
        tokio::spawn(async move {
            let mut terminal = None;
            while let Some(msg) = read.next().await {
                let forwarded = match msg {
                    Ok(Message::Text(text)) => TransportMessage::Text(text.as_str().to_string()),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => TransportMessage::Text(text),
                        Err(_) => {
                            warn!("Dropping non-UTF-8 binary frame ({} bytes)", bytes.len());
                            continue;
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        terminal = Some(TransportMessage::Closed {
                            reason: frame
                                .map(|f| f.reason.as_str().to_string())
                                .filter(|r| !r.is_empty()),
                        });
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        trace!("Received ping: {:?}", data);
                        continue;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        terminal = Some(TransportMessage::Failed(e.to_string()));
                        break;
                    }
                };

                if in_tx.send(forwarded).await.is_err() {
                    return;
                }
            }
            let terminal = terminal.unwrap_or(TransportMessage::Closed { reason: None });
            let _ = in_tx.send(terminal).await;
        });

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
