use log::{debug, info};
use marketfeed_core::Topic;
use std::collections::BTreeSet;

use crate::domain::ClientRequest;

/// Tracks which topics the client wants and which have been snapshotted.
///
/// The registry never talks to the transport; each transition returns the
/// requests the caller should send. The snapshot-received flag survives
/// reconnects for the lifetime of the registry, so a reconnect re-subscribes
/// without asking for the bulk history again.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry {
    desired: BTreeSet<Topic>,
    snapshotted: BTreeSet<Topic>,
    requested: BTreeSet<Topic>,
    pending_resync: BTreeSet<Topic>,
    snapshot_received: bool,
    welcomed: bool,
}

impl SubscriptionRegistry {
    pub fn new(topics: impl IntoIterator<Item = Topic>) -> Self {
        SubscriptionRegistry {
            desired: topics.into_iter().collect(),
            snapshotted: BTreeSet::new(),
            requested: BTreeSet::new(),
            pending_resync: BTreeSet::new(),
            snapshot_received: false,
            welcomed: false,
        }
    }

    pub fn desired(&self) -> Vec<Topic> {
        self.desired.iter().copied().collect()
    }

    pub fn snapshot_received(&self) -> bool {
        self.snapshot_received
    }

    pub fn is_snapshotted(&self, topic: Topic) -> bool {
        self.snapshotted.contains(&topic)
    }

    /// Transport opened: re-apply the subscription set and flush any resync
    /// requested while offline.
    pub fn on_open(&mut self) -> Vec<ClientRequest> {
        let mut requests = Vec::new();
        if !self.desired.is_empty() {
            requests.push(ClientRequest::subscribe(self.desired.iter().copied()));
        }
        if !self.pending_resync.is_empty() {
            let topics = std::mem::take(&mut self.pending_resync);
            info!("Flushing queued resync for {} topic(s)", topics.len());
            self.requested.extend(topics.iter().copied());
            requests.push(ClientRequest::snapshot(topics));
        }
        requests
    }

    /// Server welcome: subscribe again, and ask for the bulk snapshot only
    /// if this session has never received one.
    ///
    /// Once the flag is set, topics added later get their snapshot from
    /// `subscribe`, never from a welcome.
    pub fn on_welcome(&mut self) -> Vec<ClientRequest> {
        self.welcomed = true;
        let mut requests = Vec::new();
        if self.desired.is_empty() {
            return requests;
        }
        requests.push(ClientRequest::subscribe(self.desired.iter().copied()));

        if self.snapshot_received {
            debug!("Snapshot already received, skipping snapshot request");
        } else {
            self.requested.extend(self.desired.iter().copied());
            requests.push(ClientRequest::snapshot(self.desired.iter().copied()));
        }
        requests
    }

    /// A snapshot for one topic was merged
    pub fn on_snapshot(&mut self, topic: Topic) {
        self.snapshotted.insert(topic);
        self.requested.remove(&topic);
        if !self.snapshot_received && self.desired.is_subset(&self.snapshotted) {
            info!("Initial snapshot complete for all subscribed topics");
            self.snapshot_received = true;
        }
    }

    /// Explicit end-of-snapshot marker from the server
    pub fn on_snapshot_complete(&mut self, topics: &[Topic]) {
        let topics: Vec<Topic> = if topics.is_empty() {
            self.requested.iter().copied().collect()
        } else {
            topics.to_vec()
        };
        for topic in topics {
            self.snapshotted.insert(topic);
            self.requested.remove(&topic);
        }
        self.snapshot_received = true;
    }

    /// Transport closed; in-flight snapshot requests are lost with it
    pub fn on_close(&mut self) {
        self.welcomed = false;
        self.requested.clear();
    }

    pub fn subscribe(&mut self, topics: &[Topic], connected: bool) -> Vec<ClientRequest> {
        let added: Vec<Topic> = topics
            .iter()
            .copied()
            .filter(|t| self.desired.insert(*t))
            .collect();
        if !connected || topics.is_empty() {
            return Vec::new();
        }

        let mut requests = vec![ClientRequest::subscribe(topics.iter().copied())];
        // Topics joining an established session need their own history
        if self.welcomed {
            let fresh: Vec<Topic> = added
                .into_iter()
                .filter(|t| !self.snapshotted.contains(t) && !self.requested.contains(t))
                .collect();
            if !fresh.is_empty() {
                self.requested.extend(fresh.iter().copied());
                requests.push(ClientRequest::snapshot(fresh));
            }
        }
        requests
    }

    pub fn unsubscribe(&mut self, topics: &[Topic], connected: bool) -> Vec<ClientRequest> {
        for topic in topics {
            self.desired.remove(topic);
            self.pending_resync.remove(topic);
        }
        if connected && !topics.is_empty() {
            vec![ClientRequest::unsubscribe(topics.iter().copied())]
        } else {
            Vec::new()
        }
    }

    /// Ask for a fresh snapshot. An empty list means every desired topic.
    ///
    /// Does not touch the snapshot-received flag.
    pub fn resync(&mut self, topics: &[Topic], connected: bool) -> Vec<ClientRequest> {
        let topics: Vec<Topic> = if topics.is_empty() {
            self.desired.iter().copied().collect()
        } else {
            topics.to_vec()
        };
        if topics.is_empty() {
            return Vec::new();
        }
        if connected {
            self.requested.extend(topics.iter().copied());
            vec![ClientRequest::snapshot(topics)]
        } else {
            debug!("Queueing resync until the next open");
            self.pending_resync.extend(topics);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketfeed_core::DEFAULT_SUBSCRIPTION;

    fn snapshot_requests(requests: &[ClientRequest]) -> Vec<Vec<Topic>> {
        requests
            .iter()
            .filter_map(|r| match r {
                ClientRequest::Snapshot { topics } => Some(topics.clone()),
                _ => None,
            })
            .collect()
    }

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::new(DEFAULT_SUBSCRIPTION)
    }

    #[test]
    fn test_first_welcome_requests_snapshot() {
        let mut reg = registry();
        reg.on_open();
        let requests = reg.on_welcome();
        assert!(matches!(requests[0], ClientRequest::Subscribe { .. }));
        assert_eq!(snapshot_requests(&requests).len(), 1);
        assert_eq!(snapshot_requests(&requests)[0].len(), 5);
    }

    #[test]
    fn test_no_redundant_snapshot_after_reconnect() {
        let mut reg = registry();
        reg.on_open();
        reg.on_welcome();
        for topic in DEFAULT_SUBSCRIPTION {
            reg.on_snapshot(topic);
        }
        assert!(reg.snapshot_received());

        reg.on_close();
        let on_open = reg.on_open();
        assert!(snapshot_requests(&on_open).is_empty());
        let on_welcome = reg.on_welcome();
        assert!(matches!(on_welcome[0], ClientRequest::Subscribe { .. }));
        assert!(snapshot_requests(&on_welcome).is_empty());
    }

    #[test]
    fn test_partial_completion_marker_suppresses_later_snapshots() {
        let mut reg = registry();
        reg.on_open();
        reg.on_welcome();
        reg.on_snapshot(Topic::Indicators);
        reg.on_snapshot_complete(&[Topic::Indicators]);
        assert!(reg.snapshot_received());
        assert!(!reg.is_snapshotted(Topic::Ohlcv));

        reg.on_close();
        reg.on_open();
        let requests = reg.on_welcome();
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0], ClientRequest::Subscribe { .. }));
    }

    #[test]
    fn test_snapshot_complete_marker_sets_flag() {
        let mut reg = registry();
        reg.on_welcome();
        reg.on_snapshot(Topic::Atr);
        assert!(!reg.snapshot_received());
        reg.on_snapshot_complete(&[]);
        assert!(reg.snapshot_received());
        assert!(reg.is_snapshotted(Topic::Indicators));
    }

    #[test]
    fn test_new_topic_gets_its_own_snapshot() {
        let mut reg = SubscriptionRegistry::new([Topic::Ohlcv]);
        reg.on_welcome();
        reg.on_snapshot(Topic::Ohlcv);

        let requests = reg.subscribe(&[Topic::Ohlcv, Topic::MinuteBars], true);
        assert_eq!(snapshot_requests(&requests), vec![vec![Topic::MinuteBars]]);
        // The flag is unaffected by the new topic
        assert!(reg.snapshot_received());
    }

    #[test]
    fn test_subscribe_offline_applies_on_open() {
        let mut reg = SubscriptionRegistry::new([Topic::Ohlcv]);
        assert!(reg.subscribe(&[Topic::Atr], false).is_empty());
        let requests = reg.on_open();
        assert_eq!(
            requests[0],
            ClientRequest::Subscribe {
                topics: vec![Topic::Ohlcv, Topic::Atr]
            }
        );
    }

    #[test]
    fn test_unsubscribe() {
        let mut reg = registry();
        let requests = reg.unsubscribe(&[Topic::Atr], true);
        assert_eq!(
            requests,
            vec![ClientRequest::Unsubscribe {
                topics: vec![Topic::Atr]
            }]
        );
        assert!(!reg.desired().contains(&Topic::Atr));
        assert!(reg.unsubscribe(&[Topic::Ohlcv], false).is_empty());
    }

    #[test]
    fn test_resync_keeps_flag_and_queues_offline() {
        let mut reg = registry();
        reg.on_snapshot_complete(&[]);
        assert!(reg.resync(&[Topic::Ohlcv], false).is_empty());
        assert!(reg.snapshot_received());

        let requests = reg.on_open();
        assert_eq!(snapshot_requests(&requests), vec![vec![Topic::Ohlcv]]);

        let requests = reg.resync(&[], true);
        assert_eq!(snapshot_requests(&requests)[0].len(), 5);
        assert!(reg.snapshot_received());
    }
}
