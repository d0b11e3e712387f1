use marketfeed_core::{
    AtrData, IndicatorSnapshot, OhlcvBar, PerformanceData, PositionData, Prediction, SessionInfo,
    TargetValue, Topic,
};
use serde::{Deserialize, Serialize};

/// Client -> server requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    Subscribe { topics: Vec<Topic> },
    Unsubscribe { topics: Vec<Topic> },
    Snapshot { topics: Vec<Topic> },
    Ping,
}

impl ClientRequest {
    pub fn subscribe(topics: impl IntoIterator<Item = Topic>) -> Self {
        ClientRequest::Subscribe {
            topics: topics.into_iter().collect(),
        }
    }

    pub fn unsubscribe(topics: impl IntoIterator<Item = Topic>) -> Self {
        ClientRequest::Unsubscribe {
            topics: topics.into_iter().collect(),
        }
    }

    pub fn snapshot(topics: impl IntoIterator<Item = Topic>) -> Self {
        ClientRequest::Snapshot {
            topics: topics.into_iter().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Payload of a snapshot or update for one topic
#[derive(Debug, Clone, PartialEq)]
pub enum TopicData {
    Indicators {
        records: Vec<IndicatorSnapshot>,
        names: Option<Vec<String>>,
        feature_hash: Option<String>,
    },
    Ohlcv(Vec<OhlcvBar>),
    MinuteBars(Vec<OhlcvBar>),
    Atr(Option<AtrData>),
    Position(Option<PositionData>),
    Performance(Option<PerformanceData>),
    Predictions(Vec<Prediction>),
    Targets(Vec<TargetValue>),
}

impl TopicData {
    pub fn topic(&self) -> Topic {
        match self {
            TopicData::Indicators { .. } => Topic::Indicators,
            TopicData::Ohlcv(_) => Topic::Ohlcv,
            TopicData::MinuteBars(_) => Topic::MinuteBars,
            TopicData::Atr(_) => Topic::Atr,
            TopicData::Position(_) => Topic::Position,
            TopicData::Performance(_) => Topic::Performance,
            TopicData::Predictions(_) => Topic::Predictions,
            TopicData::Targets(_) => Topic::Targets,
        }
    }

    /// Number of records carried
    pub fn len(&self) -> usize {
        match self {
            TopicData::Indicators { records, .. } => records.len(),
            TopicData::Ohlcv(bars) | TopicData::MinuteBars(bars) => bars.len(),
            TopicData::Predictions(preds) => preds.len(),
            TopicData::Targets(targets) => targets.len(),
            TopicData::Atr(v) => usize::from(v.is_some()),
            TopicData::Position(v) => usize::from(v.is_some()),
            TopicData::Performance(v) => usize::from(v.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Canonical event produced by the protocol adapter.
///
/// Both wire generations normalize into this type before anything
/// touches client state.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    SnapshotReceived { topic: Topic, data: TopicData },
    UpdateReceived { topic: Topic, data: TopicData },
    WelcomeReceived(SessionInfo),
    SubscriptionAck { topics: Vec<Topic> },
    Unsubscribed { topics: Vec<Topic> },
    SnapshotComplete { topics: Vec<Topic> },
    ErrorReceived { message: String },
    HeartbeatReceived,
}

impl FeedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::SnapshotReceived { .. } => "snapshot",
            FeedEvent::UpdateReceived { .. } => "update",
            FeedEvent::WelcomeReceived(_) => "welcome",
            FeedEvent::SubscriptionAck { .. } => "subscribed",
            FeedEvent::Unsubscribed { .. } => "unsubscribed",
            FeedEvent::SnapshotComplete { .. } => "snapshot_complete",
            FeedEvent::ErrorReceived { .. } => "error",
            FeedEvent::HeartbeatReceived => "heartbeat",
        }
    }
}

/// Change notifications for consumers
#[derive(Debug, Clone, PartialEq)]
pub enum FeedNotice {
    ConnectionChanged(super::ConnectionState),
    SessionEstablished { client_id: String },
    TopicUpdated(Topic),
    SnapshotComplete,
    Error(String),
}
