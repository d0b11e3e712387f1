use log::{debug, warn};
use marketfeed_core::{
    AtrData, IndicatorSnapshot, OhlcvBar, PerformanceData, PositionData, Prediction, SessionInfo,
    TargetValue, Topic, TradingRules,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{EnvelopeFrame, FeedEvent, Frame, TopicData, UnifiedFrame};
use crate::error::FrameError;

/// Normalizes both protocol generations into [`FeedEvent`]s
///
/// Stateless: every frame is interpreted on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolAdapter;

impl ProtocolAdapter {
    pub fn new() -> Self {
        ProtocolAdapter
    }

    /// Returns `Ok(None)` for frames that carry nothing actionable.
    pub fn normalize(&self, frame: Frame) -> Result<Option<FeedEvent>, FrameError> {
        match frame {
            Frame::Envelope(envelope) => self.normalize_envelope(envelope),
            Frame::Unified(unified) => self.normalize_unified(unified),
            Frame::Unrecognized(value) => {
                warn!("Dropping unrecognized frame: {}", truncate(&value.to_string()));
                Ok(None)
            }
        }
    }

    fn normalize_envelope(&self, envelope: EnvelopeFrame) -> Result<Option<FeedEvent>, FrameError> {
        let event = match envelope {
            EnvelopeFrame::InitialData {
                client_id: Some(client_id),
                trading_rules,
                ..
            } => FeedEvent::WelcomeReceived(SessionInfo {
                client_id,
                trading_rules: trading_rules.and_then(parse_trading_rules),
            }),
            EnvelopeFrame::InitialData {
                topic: Some(topic),
                data,
                ..
            } => {
                let Some(topic) = known_topic(&topic) else {
                    return Ok(None);
                };
                let data = snapshot_payload(topic, data.unwrap_or(Value::Null))?;
                FeedEvent::SnapshotReceived { topic, data }
            }
            EnvelopeFrame::InitialData { .. } => {
                warn!("Dropping initial_data frame with neither clientId nor topic");
                return Ok(None);
            }
            EnvelopeFrame::Snapshot { topic, data } => {
                let Some(topic) = known_topic(&topic) else {
                    return Ok(None);
                };
                let data = snapshot_payload(topic, data)?;
                FeedEvent::SnapshotReceived { topic, data }
            }
            EnvelopeFrame::Update { topic, data } => {
                let Some(topic) = known_topic(&topic) else {
                    return Ok(None);
                };
                let data = update_payload(topic, data)?;
                FeedEvent::UpdateReceived { topic, data }
            }
            EnvelopeFrame::Subscribed { topics } => FeedEvent::SubscriptionAck {
                topics: known_topics(&topics),
            },
            EnvelopeFrame::Unsubscribed { topics } => FeedEvent::Unsubscribed {
                topics: known_topics(&topics),
            },
            EnvelopeFrame::SnapshotComplete { topics } => FeedEvent::SnapshotComplete {
                topics: known_topics(&topics),
            },
            EnvelopeFrame::Error {
                message,
                error,
                rest,
            } => FeedEvent::ErrorReceived {
                message: EnvelopeFrame::error_text(&message, &error, &rest),
            },
            EnvelopeFrame::Pong | EnvelopeFrame::Heartbeat => FeedEvent::HeartbeatReceived,
            EnvelopeFrame::Unknown => {
                warn!("Dropping envelope frame of unknown type");
                return Ok(None);
            }
        };
        Ok(Some(event))
    }

    /// Legacy stream frames are always incremental updates
    fn normalize_unified(&self, frame: UnifiedFrame) -> Result<Option<FeedEvent>, FrameError> {
        let Some(topic) = Topic::from_stream_channel(&frame.channel) else {
            debug!("Ignoring stream channel {}", frame.channel);
            return Ok(None);
        };
        let data = update_payload(topic, Value::Object(frame.body))?;
        Ok(Some(FeedEvent::UpdateReceived { topic, data }))
    }
}

fn known_topic(name: &str) -> Option<Topic> {
    match name.parse() {
        Ok(topic) => Some(topic),
        Err(e) => {
            warn!("{}, dropping frame", e);
            None
        }
    }
}

fn known_topics(names: &[String]) -> Vec<Topic> {
    names.iter().filter_map(|n| n.parse().ok()).collect()
}

fn parse_trading_rules(value: Value) -> Option<TradingRules> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(rules) => Some(rules),
        Err(e) => {
            warn!("Ignoring malformed trading rules: {}", e);
            None
        }
    }
}

/// Build the payload of a per-topic `initial_data` frame.
///
/// Series arrive wrapped (`snapshots`, `bars`, `predictions`, `targets`),
/// the ATR slot as `current`; a bare array or record is accepted as well.
fn snapshot_payload(topic: Topic, data: Value) -> Result<TopicData, FrameError> {
    match topic {
        Topic::Indicators => {
            let (names, feature_hash) = indicator_metadata(&data);
            let records = many(topic, unwrap_field(data, "snapshots"))?;
            Ok(TopicData::Indicators {
                records,
                names,
                feature_hash,
            })
        }
        Topic::Ohlcv => Ok(TopicData::Ohlcv(many(topic, unwrap_field(data, "bars"))?)),
        Topic::MinuteBars => Ok(TopicData::MinuteBars(many(topic, unwrap_field(data, "bars"))?)),
        Topic::Predictions => Ok(TopicData::Predictions(many(
            topic,
            prediction_records(data),
        )?)),
        Topic::Targets => Ok(TopicData::Targets(many(topic, unwrap_field(data, "targets"))?)),
        Topic::Atr => Ok(TopicData::Atr(optional::<AtrData>(
            topic,
            unwrap_field(data, "current"),
        )?)),
        Topic::Position => Ok(TopicData::Position(optional::<PositionData>(topic, data)?)),
        Topic::Performance => Ok(TopicData::Performance(optional::<PerformanceData>(
            topic, data,
        )?)),
    }
}

/// Build the payload of an incremental update, from either generation
fn update_payload(topic: Topic, data: Value) -> Result<TopicData, FrameError> {
    if data.is_null() {
        return Err(FrameError::MissingPayload { topic });
    }
    match topic {
        Topic::Indicators => {
            let (names, feature_hash) = indicator_metadata(&data);
            let records: Vec<IndicatorSnapshot> = many(topic, data)?;
            Ok(TopicData::Indicators {
                records,
                names,
                feature_hash,
            })
        }
        Topic::Ohlcv => Ok(TopicData::Ohlcv(many::<OhlcvBar>(topic, data)?)),
        Topic::MinuteBars => Ok(TopicData::MinuteBars(many::<OhlcvBar>(topic, data)?)),
        Topic::Predictions => Ok(TopicData::Predictions(many::<Prediction>(
            topic,
            prediction_records(data),
        )?)),
        Topic::Targets => Ok(TopicData::Targets(many::<TargetValue>(topic, data)?)),
        Topic::Atr => Ok(TopicData::Atr(Some(one(topic, data)?))),
        Topic::Position => Ok(TopicData::Position(Some(one(topic, data)?))),
        Topic::Performance => Ok(TopicData::Performance(Some(one(topic, data)?))),
    }
}

fn indicator_metadata(data: &Value) -> (Option<Vec<String>>, Option<String>) {
    let Some(obj) = data.as_object() else {
        return (None, None);
    };
    let names = ["names", "feature_names", "featureNames"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok());
    let hash = ["feature_hash", "featureHash"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(Value::as_str)
        .map(str::to_string);
    (names, hash)
}

/// Prediction records, from either a wrapped list or a single record.
///
/// Legacy records may omit `model_id` (taken from the frame), nest their
/// thresholds under `thresholds`, and report the realized value as `target`.
fn prediction_records(data: Value) -> Value {
    let model_id = data.get("model_id").cloned();
    let mut records = unwrap_field(data, "predictions");
    if let Value::Array(items) = &mut records {
        for item in items {
            fill_prediction(item, model_id.as_ref());
        }
    } else {
        fill_prediction(&mut records, model_id.as_ref());
    }
    records
}

fn fill_prediction(item: &mut Value, model_id: Option<&Value>) {
    let Value::Object(obj) = item else {
        return;
    };
    let has_model = obj
        .get("model_id")
        .and_then(Value::as_str)
        .is_some_and(|m| !m.is_empty());
    if let (false, Some(model_id)) = (has_model, model_id) {
        obj.insert("model_id".to_string(), model_id.clone());
    }

    if let Some(Value::Object(thresholds)) = obj.remove("thresholds") {
        let sides = [
            ("long_threshold", ["long_optimal", "long"]),
            ("short_threshold", ["short_optimal", "short"]),
        ];
        for (field, keys) in sides {
            if let Some(v) = keys.iter().find_map(|k| thresholds.get(*k).filter(|v| !v.is_null())) {
                obj.insert(field.to_string(), v.clone());
            }
        }
    }

    if let Some(target) = obj.remove("target") {
        if !target.is_null() {
            obj.insert("actual".to_string(), target);
        }
    }
}

fn unwrap_field(data: Value, field: &str) -> Value {
    match data {
        Value::Object(mut obj) if obj.contains_key(field) => obj.remove(field).unwrap_or(Value::Null),
        other => other,
    }
}

fn one<T: DeserializeOwned>(topic: Topic, value: Value) -> Result<T, FrameError> {
    serde_json::from_value(value).map_err(|source| FrameError::Payload { topic, source })
}

fn optional<T: DeserializeOwned>(topic: Topic, value: Value) -> Result<Option<T>, FrameError> {
    if value.is_null() {
        return Ok(None);
    }
    one(topic, value).map(Some)
}

fn many<T: DeserializeOwned>(topic: Topic, value: Value) -> Result<Vec<T>, FrameError> {
    match value {
        Value::Array(_) => one(topic, value),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![one(topic, single)?]),
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
