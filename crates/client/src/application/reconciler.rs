//! Merges normalized feed events into the client's in-memory state.
//!
//! Series topics live in bounded, deduplicated [`HistoryBuffer`]s; ATR,
//! position and performance are latest-value slots. Snapshots replace a
//! series wholesale, updates append (duplicates are silently ignored).
//! Applying the same update twice leaves the state unchanged.

use log::{debug, info};
use marketfeed_core::{
    AtrData, FeatureNames, HistoryBuffer, IndicatorSnapshot, OhlcvBar, PerformanceData,
    PositionData, Prediction, SessionInfo, TargetValue, Topic, TradingRules,
};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::config::HistoryCapacities;
use crate::domain::{FeedEvent, TopicData};

/// Everything the client has learned from the feed
#[derive(Debug, Clone)]
pub struct FeedState {
    pub indicators: HistoryBuffer<IndicatorSnapshot>,
    pub ohlcv: HistoryBuffer<OhlcvBar>,
    pub minute_bars: HistoryBuffer<OhlcvBar>,
    pub predictions: HistoryBuffer<Prediction>,
    pub targets: HistoryBuffer<TargetValue>,
    pub atr: Option<AtrData>,
    pub position: Option<PositionData>,
    pub performance: Option<PerformanceData>,
    pub session: Option<SessionInfo>,
    pub feature_names: FeatureNames,
    /// Topics the server has confirmed
    pub acknowledged: BTreeSet<Topic>,
}

impl FeedState {
    pub fn new(capacities: HistoryCapacities) -> Self {
        FeedState {
            indicators: HistoryBuffer::new(capacities.indicators),
            ohlcv: HistoryBuffer::new(capacities.ohlcv),
            minute_bars: HistoryBuffer::new(capacities.minute_bars),
            predictions: HistoryBuffer::new(capacities.predictions),
            targets: HistoryBuffer::new(capacities.targets),
            atr: None,
            position: None,
            performance: None,
            session: None,
            feature_names: FeatureNames::default(),
            acknowledged: BTreeSet::new(),
        }
    }

    /// True once anything worth rendering has been received
    pub fn has_cached_data(&self) -> bool {
        !self.indicators.is_empty()
            || !self.ohlcv.is_empty()
            || !self.minute_bars.is_empty()
            || !self.predictions.is_empty()
            || !self.targets.is_empty()
            || self.atr.is_some()
            || self.position.is_some()
            || self.performance.is_some()
    }
}

/// Sole writer of [`FeedState`]
pub struct StateReconciler {
    state: Arc<RwLock<FeedState>>,
}

impl StateReconciler {
    pub fn new(capacities: HistoryCapacities) -> Self {
        StateReconciler {
            state: Arc::new(RwLock::new(FeedState::new(capacities))),
        }
    }

    /// Read-only handle for consumers
    pub fn view(&self) -> FeedView {
        FeedView {
            state: Arc::clone(&self.state),
        }
    }

    /// Merge an event. Returns the topic whose data changed, if any.
    pub fn apply(&self, event: &FeedEvent) -> Option<Topic> {
        let mut state = self.state.write();
        match event {
            FeedEvent::SnapshotReceived { topic, data } => {
                merge_snapshot(&mut state, data);
                info!("Snapshot received for {} ({} records)", topic, data.len());
                Some(*topic)
            }
            FeedEvent::UpdateReceived { topic, data } => {
                if merge_update(&mut state, data) {
                    Some(*topic)
                } else {
                    debug!("Update for {} left state unchanged", topic);
                    None
                }
            }
            FeedEvent::WelcomeReceived(info) => {
                state.session = Some(info.clone());
                None
            }
            FeedEvent::SubscriptionAck { topics } => {
                state.acknowledged.clear();
                state.acknowledged.extend(topics.iter().copied());
                None
            }
            FeedEvent::Unsubscribed { topics } => {
                for topic in topics {
                    state.acknowledged.remove(topic);
                }
                None
            }
            FeedEvent::SnapshotComplete { .. }
            | FeedEvent::ErrorReceived { .. }
            | FeedEvent::HeartbeatReceived => None,
        }
    }
}

fn merge_snapshot(state: &mut FeedState, data: &TopicData) {
    match data {
        TopicData::Indicators {
            records,
            names,
            feature_hash,
        } => {
            adopt_names(state, names.as_deref(), feature_hash.as_deref(), records);
            state
                .indicators
                .replace(records.iter().filter(|r| r.valid).cloned());
        }
        TopicData::Ohlcv(bars) => state.ohlcv.replace(bars.iter().cloned()),
        TopicData::MinuteBars(bars) => state.minute_bars.replace(bars.iter().cloned()),
        TopicData::Predictions(preds) => state.predictions.replace(preds.iter().cloned()),
        TopicData::Targets(targets) => state.targets.replace(targets.iter().cloned()),
        TopicData::Atr(atr) => state.atr = atr.clone(),
        TopicData::Position(pos) => state.position = pos.clone(),
        TopicData::Performance(perf) => state.performance = perf.clone(),
    }
}

fn merge_update(state: &mut FeedState, data: &TopicData) -> bool {
    match data {
        TopicData::Indicators {
            records,
            names,
            feature_hash,
        } => {
            let renamed = adopt_names(state, names.as_deref(), feature_hash.as_deref(), records);
            let mut appended = false;
            for record in records.iter().filter(|r| r.valid) {
                appended |= state.indicators.push(record.clone());
            }
            appended || renamed
        }
        TopicData::Ohlcv(bars) => push_all(&mut state.ohlcv, bars),
        TopicData::MinuteBars(bars) => push_all(&mut state.minute_bars, bars),
        TopicData::Predictions(preds) => push_all(&mut state.predictions, preds),
        // A target is republished once its horizon matures
        TopicData::Targets(targets) => targets
            .iter()
            .fold(false, |changed, t| state.targets.upsert(t.clone()) || changed),
        TopicData::Atr(atr) => replace_slot(&mut state.atr, atr),
        TopicData::Position(pos) => replace_slot(&mut state.position, pos),
        TopicData::Performance(perf) => replace_slot(&mut state.performance, perf),
    }
}

fn push_all<T>(buffer: &mut HistoryBuffer<T>, records: &[T]) -> bool
where
    T: marketfeed_core::Keyed + Clone,
{
    let mut appended = false;
    for record in records {
        appended |= buffer.push(record.clone());
    }
    appended
}

/// Latest wins; an update without a value leaves the slot alone
fn replace_slot<T: Clone + PartialEq>(slot: &mut Option<T>, value: &Option<T>) -> bool {
    match value {
        Some(v) if slot.as_ref() != Some(v) => {
            *slot = Some(v.clone());
            true
        }
        _ => false,
    }
}

/// Names may travel on the frame or on the records themselves
fn adopt_names(
    state: &mut FeedState,
    names: Option<&[String]>,
    hash: Option<&str>,
    records: &[IndicatorSnapshot],
) -> bool {
    let from_records = records.iter().rev().find_map(|r| r.feature_names.as_deref());
    let hash = hash.or_else(|| records.iter().rev().find_map(|r| r.feature_hash.as_deref()));
    match names.or(from_records) {
        Some(names) => {
            let changed = state.feature_names.update(names, hash);
            if changed {
                info!("Indicator feature names changed ({} columns)", names.len());
            }
            changed
        }
        None => false,
    }
}

/// Cloneable read handle over [`FeedState`]
///
/// Readers take a short shared lock and copy out what they need, so they
/// never wait on the connection lifecycle.
#[derive(Clone)]
pub struct FeedView {
    state: Arc<RwLock<FeedState>>,
}

impl FeedView {
    pub fn indicators(&self) -> Vec<IndicatorSnapshot> {
        self.state.read().indicators.to_vec()
    }

    pub fn latest_indicator(&self) -> Option<IndicatorSnapshot> {
        self.state.read().indicators.latest().cloned()
    }

    pub fn ohlcv(&self) -> Vec<OhlcvBar> {
        self.state.read().ohlcv.to_vec()
    }

    pub fn latest_ohlcv(&self) -> Option<OhlcvBar> {
        self.state.read().ohlcv.latest().cloned()
    }

    pub fn minute_bars(&self) -> Vec<OhlcvBar> {
        self.state.read().minute_bars.to_vec()
    }

    /// Newest first
    pub fn predictions(&self) -> Vec<Prediction> {
        let mut preds = self.state.read().predictions.to_vec();
        preds.sort_by(|a, b| b.ts.cmp(&a.ts));
        preds
    }

    /// Oldest first
    pub fn targets(&self) -> Vec<TargetValue> {
        self.state.read().targets.to_vec()
    }

    /// Target value for a model and bar; `None` if unknown or not yet matured
    pub fn target(&self, model_id: &str, ts: i64) -> Option<f64> {
        let state = self.state.read();
        state
            .targets
            .iter()
            .find(|t| t.key() == (model_id.to_string(), ts))
            .and_then(|t| t.value)
    }

    pub fn atr(&self) -> Option<AtrData> {
        self.state.read().atr.clone()
    }

    pub fn position(&self) -> Option<PositionData> {
        self.state.read().position.clone()
    }

    pub fn performance(&self) -> Option<PerformanceData> {
        self.state.read().performance.clone()
    }

    pub fn client_id(&self) -> Option<String> {
        self.state.read().session.as_ref().map(|s| s.client_id.clone())
    }

    pub fn trading_rules(&self) -> Option<TradingRules> {
        self.state
            .read()
            .session
            .as_ref()
            .and_then(|s| s.trading_rules.clone())
    }

    pub fn acknowledged_topics(&self) -> Vec<Topic> {
        self.state.read().acknowledged.iter().copied().collect()
    }

    pub fn feature_names(&self) -> FeatureNames {
        self.state.read().feature_names.clone()
    }

    /// Named value from the latest indicator snapshot
    pub fn indicator_value(&self, name: &str) -> Option<f64> {
        let state = self.state.read();
        let latest = state.indicators.latest()?;
        state.feature_names.value_of(latest, name)
    }

    /// `(timestamp, value)` pairs for one named indicator, oldest first
    pub fn indicator_series(&self, name: &str) -> Vec<(i64, f64)> {
        let state = self.state.read();
        state
            .indicators
            .iter()
            .filter_map(|snap| {
                state
                    .feature_names
                    .value_of(snap, name)
                    .map(|v| (snap.timestamp, v))
            })
            .collect()
    }

    pub fn has_cached_data(&self) -> bool {
        self.state.read().has_cached_data()
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> FeedState {
        self.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler(capacity: usize) -> StateReconciler {
        StateReconciler::new(HistoryCapacities::uniform(capacity))
    }

    fn bar(ts: i64, close: f64) -> OhlcvBar {
        OhlcvBar::new(ts, close, close, close, close, 1.0)
    }

    fn ohlcv_update(bars: Vec<OhlcvBar>) -> FeedEvent {
        FeedEvent::UpdateReceived {
            topic: Topic::Ohlcv,
            data: TopicData::Ohlcv(bars),
        }
    }

    fn indicator_update(records: Vec<IndicatorSnapshot>) -> FeedEvent {
        FeedEvent::UpdateReceived {
            topic: Topic::Indicators,
            data: TopicData::Indicators {
                records,
                names: None,
                feature_hash: None,
            },
        }
    }

    #[test]
    fn test_duplicate_ohlcv_bar_is_dropped() {
        let r = reconciler(10);
        let view = r.view();
        assert_eq!(r.apply(&ohlcv_update(vec![bar(100, 1.0)])), Some(Topic::Ohlcv));
        assert_eq!(r.apply(&ohlcv_update(vec![bar(100, 2.0)])), None);

        let bars = view.ohlcv();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 1.0);
    }

    #[test]
    fn test_capacity_three_keeps_latest() {
        let r = reconciler(3);
        for ts in 1..=4 {
            r.apply(&ohlcv_update(vec![bar(ts, 0.0)]));
        }
        let ts: Vec<i64> = r.view().ohlcv().iter().map(|b| b.timestamp).collect();
        assert_eq!(ts, vec![2, 3, 4]);
    }

    #[test]
    fn test_snapshot_filters_invalid_indicators() {
        let r = reconciler(10);
        r.apply(&FeedEvent::SnapshotReceived {
            topic: Topic::Indicators,
            data: TopicData::Indicators {
                records: vec![
                    IndicatorSnapshot::new(1, vec![1.0]),
                    IndicatorSnapshot::new(2, vec![2.0]).invalid(),
                    IndicatorSnapshot::new(3, vec![3.0]),
                ],
                names: None,
                feature_hash: None,
            },
        });
        let ts: Vec<i64> = r.view().indicators().iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![1, 3]);
    }

    #[test]
    fn test_invalid_update_is_ignored() {
        let r = reconciler(10);
        let changed = r.apply(&indicator_update(vec![IndicatorSnapshot::new(1, vec![]).invalid()]));
        assert_eq!(changed, None);
        assert!(r.view().indicators().is_empty());
    }

    #[test]
    fn test_update_is_idempotent() {
        let r = reconciler(10);
        let event = indicator_update(vec![IndicatorSnapshot::new(5, vec![1.0, 2.0])]);
        r.apply(&event);
        let before = r.view().indicators();
        assert_eq!(r.apply(&event), None);
        assert_eq!(r.view().indicators(), before);
    }

    #[test]
    fn test_snapshot_replaces_series() {
        let r = reconciler(10);
        r.apply(&ohlcv_update(vec![bar(50, 0.0)]));
        r.apply(&FeedEvent::SnapshotReceived {
            topic: Topic::Ohlcv,
            data: TopicData::Ohlcv(vec![bar(1, 0.0), bar(2, 0.0)]),
        });
        let ts: Vec<i64> = r.view().ohlcv().iter().map(|b| b.timestamp).collect();
        assert_eq!(ts, vec![1, 2]);
    }

    #[test]
    fn test_latest_value_slots() {
        let r = reconciler(10);
        let atr = |v: f64| AtrData {
            timestamp: 1,
            value: v,
            stop_loss_level: 0.0,
            take_profit_level: 0.0,
        };
        r.apply(&FeedEvent::SnapshotReceived {
            topic: Topic::Atr,
            data: TopicData::Atr(Some(atr(1.0))),
        });
        r.apply(&FeedEvent::UpdateReceived {
            topic: Topic::Atr,
            data: TopicData::Atr(Some(atr(2.0))),
        });
        assert_eq!(r.view().atr().unwrap().value, 2.0);

        // A snapshot with no current value clears the slot
        r.apply(&FeedEvent::SnapshotReceived {
            topic: Topic::Atr,
            data: TopicData::Atr(None),
        });
        assert!(r.view().atr().is_none());
    }

    #[test]
    fn test_names_follow_frames() {
        let r = reconciler(10);
        let names = vec!["x".to_string(), "y".to_string()];
        r.apply(&FeedEvent::UpdateReceived {
            topic: Topic::Indicators,
            data: TopicData::Indicators {
                records: vec![IndicatorSnapshot::new(1, vec![0.5, 0.7])],
                names: Some(names.clone()),
                feature_hash: Some("h".into()),
            },
        });
        let view = r.view();
        assert_eq!(view.feature_names().names(), names.as_slice());
        assert_eq!(view.indicator_value("y"), Some(0.7));

        r.apply(&indicator_update(vec![IndicatorSnapshot::new(2, vec![0.6, 0.8])]));
        assert_eq!(view.indicator_series("x"), vec![(1, 0.5), (2, 0.6)]);
    }

    #[test]
    fn test_acknowledged_topics() {
        let r = reconciler(10);
        r.apply(&FeedEvent::SubscriptionAck {
            topics: vec![Topic::Atr, Topic::Ohlcv],
        });
        r.apply(&FeedEvent::Unsubscribed {
            topics: vec![Topic::Atr],
        });
        assert_eq!(r.view().acknowledged_topics(), vec![Topic::Ohlcv]);
    }

    #[test]
    fn test_predictions_newest_first() {
        let r = reconciler(10);
        let p = |ts| Prediction {
            model_id: "m".into(),
            ts,
            prediction: 0.0,
            long_threshold: None,
            short_threshold: None,
            feature_hash: None,
            actual: None,
        };
        r.apply(&FeedEvent::UpdateReceived {
            topic: Topic::Predictions,
            data: TopicData::Predictions(vec![p(1), p(3), p(2)]),
        });
        let ts: Vec<i64> = r.view().predictions().iter().map(|p| p.ts).collect();
        assert_eq!(ts, vec![3, 2, 1]);
    }

    #[test]
    fn test_target_updates_overwrite_pending_value() {
        let r = reconciler(10);
        let target = |value: Option<f64>| TargetValue {
            name: Some("fwd_ret".into()),
            model_id: None,
            ts: 60_000,
            value,
            horizon_bars: Some(4),
            matured_at: None,
        };
        let update = |value| FeedEvent::UpdateReceived {
            topic: Topic::Targets,
            data: TopicData::Targets(vec![target(value)]),
        };

        assert_eq!(r.apply(&update(None)), Some(Topic::Targets));
        assert_eq!(r.view().target("active", 60_000), None);
        assert_eq!(r.apply(&update(Some(0.02))), Some(Topic::Targets));
        assert_eq!(r.apply(&update(Some(0.02))), None);
        assert_eq!(r.view().target("active", 60_000), Some(0.02));
        assert_eq!(r.view().targets().len(), 1);
        assert!(r.view().has_cached_data());
    }
}
