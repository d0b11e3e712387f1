//! Inbound frame classification.
//!
//! The feed speaks two generations of protocol on the same socket:
//!
//! - **Unified** (legacy stream): a bare object with a `topic` field and no
//!   `type`, e.g. `{"topic": "hour", "ts": ..., "open": ...}`. Every frame
//!   is an incremental update.
//! - **Envelope**: an object with a `type` discriminator
//!   (`initial_data`, `update`, `subscribed`, ...).
//!
//! A `type` field always wins: `{"type": "update", "topic": "ohlcv"}` is an
//! envelope frame.

use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::FrameError;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Unified(UnifiedFrame),
    Envelope(EnvelopeFrame),
    /// Valid JSON of a shape the client does not understand
    Unrecognized(Value),
}

/// Legacy stream frame: the channel name plus the remaining fields
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedFrame {
    pub channel: String,
    pub body: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvelopeFrame {
    /// Either the session welcome (`clientId`) or a per-topic snapshot
    InitialData {
        #[serde(default, rename = "clientId", alias = "client_id")]
        client_id: Option<String>,
        #[serde(default, rename = "tradingRules", alias = "trading_rules")]
        trading_rules: Option<Value>,
        #[serde(default)]
        topic: Option<String>,
        #[serde(default)]
        data: Option<Value>,
    },
    Update {
        topic: String,
        #[serde(default)]
        data: Value,
    },
    /// Legacy bulk replacement for one topic
    Snapshot {
        topic: String,
        #[serde(default)]
        data: Value,
    },
    Subscribed {
        #[serde(default)]
        topics: Vec<String>,
    },
    Unsubscribed {
        #[serde(default)]
        topics: Vec<String>,
    },
    SnapshotComplete {
        #[serde(default)]
        topics: Vec<String>,
    },
    Error {
        #[serde(default)]
        message: Option<Value>,
        #[serde(default)]
        error: Option<Value>,
        #[serde(flatten)]
        rest: Map<String, Value>,
    },
    Pong,
    Heartbeat,
    #[serde(other)]
    Unknown,
}

impl Frame {
    /// Parse raw text. Fails only if the text is not JSON.
    pub fn parse(text: &str) -> Result<Frame, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Frame::classify(value))
    }

    pub fn classify(value: Value) -> Frame {
        let Value::Object(mut map) = value else {
            return Frame::Unrecognized(value);
        };

        if map.contains_key("type") {
            nest_flat_payload(&mut map);
            let value = Value::Object(map);
            return match EnvelopeFrame::deserialize(&value) {
                Ok(envelope) => Frame::Envelope(envelope),
                Err(e) => {
                    debug!("Envelope frame did not match any known shape: {}", e);
                    Frame::Unrecognized(value)
                }
            };
        }

        match map.remove("topic") {
            Some(Value::String(channel)) => Frame::Unified(UnifiedFrame { channel, body: map }),
            Some(other) => {
                map.insert("topic".to_string(), other);
                Frame::Unrecognized(Value::Object(map))
            }
            None => Frame::Unrecognized(Value::Object(map)),
        }
    }
}

/// Older `update`/`snapshot` frames carry their record beside `type` and
/// `topic` instead of under `data`. Move those fields under `data`.
fn nest_flat_payload(map: &mut Map<String, Value>) {
    let flat = matches!(
        map.get("type").and_then(Value::as_str),
        Some("update" | "snapshot")
    ) && !map.contains_key("data");
    if !flat {
        return;
    }
    let mut payload = Map::new();
    for (key, value) in std::mem::take(map) {
        if key == "type" || key == "topic" {
            map.insert(key, value);
        } else {
            payload.insert(key, value);
        }
    }
    if !payload.is_empty() {
        map.insert("data".to_string(), Value::Object(payload));
    }
}

impl EnvelopeFrame {
    /// Render an error frame's text: `message`, then `error`, then the
    /// whole frame serialized.
    pub fn error_text(
        message: &Option<Value>,
        error: &Option<Value>,
        rest: &Map<String, Value>,
    ) -> String {
        let pick = |v: &Option<Value>| match v {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Null) | Some(Value::String(_)) | None => None,
            Some(other) => Some(other.to_string()),
        };
        pick(message).or_else(|| pick(error)).unwrap_or_else(|| {
            let mut frame = rest.clone();
            frame.insert("type".to_string(), Value::from("error"));
            for (key, value) in [("message", message), ("error", error)] {
                if let Some(value) = value {
                    frame.insert(key.to_string(), value.clone());
                }
            }
            Value::Object(frame).to_string()
        })
    }
}
