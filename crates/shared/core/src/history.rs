//! Bounded, deduplicated history buffer.
//!
//! Records are kept in arrival order and keyed by a natural key (usually
//! the timestamp). A key is accepted at most once while its record is
//! retained; when the buffer grows past capacity the oldest records are
//! evicted from the front.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use crate::records::{IndicatorSnapshot, OhlcvBar, Prediction, PredictionKey, TargetKey, TargetValue};
use crate::time::TimestampMs;

/// Records that carry a natural deduplication key
pub trait Keyed {
    type Key: Clone + Eq + Hash;

    fn key(&self) -> Self::Key;
}

impl Keyed for IndicatorSnapshot {
    type Key = TimestampMs;

    fn key(&self) -> TimestampMs {
        self.timestamp
    }
}

impl Keyed for OhlcvBar {
    type Key = TimestampMs;

    fn key(&self) -> TimestampMs {
        self.timestamp
    }
}

impl Keyed for Prediction {
    type Key = PredictionKey;

    fn key(&self) -> PredictionKey {
        Prediction::key(self)
    }
}

impl Keyed for TargetValue {
    type Key = TargetKey;

    fn key(&self) -> TargetKey {
        TargetValue::key(self)
    }
}

#[derive(Debug, Clone)]
pub struct HistoryBuffer<T: Keyed> {
    entries: VecDeque<T>,
    keys: HashSet<T::Key>,
    capacity: usize,
}

impl<T: Keyed> HistoryBuffer<T> {
    /// Create an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryBuffer {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            keys: HashSet::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a record. Returns false if its key is already present.
    pub fn push(&mut self, record: T) -> bool {
        let key = record.key();
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.insert(key);
        self.entries.push_back(record);
        self.evict();
        true
    }

    /// Replace the contents with a snapshot.
    ///
    /// Duplicate keys within the snapshot keep their first occurrence, and
    /// only the most recent `capacity` records are retained.
    pub fn replace<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.entries.clear();
        self.keys.clear();
        for record in records {
            let key = record.key();
            if self.keys.insert(key) {
                self.entries.push_back(record);
            }
        }
        self.evict();
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some(old) = self.entries.pop_front() {
                self.keys.remove(&old.key());
            }
        }
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.keys.contains(key)
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.keys.clear();
    }
}

impl<T: Keyed + PartialEq> HistoryBuffer<T> {
    /// Insert a record, overwriting a retained record with the same key in
    /// place. Returns true if the buffer changed.
    pub fn upsert(&mut self, record: T) -> bool {
        let key = record.key();
        if !self.keys.contains(&key) {
            return self.push(record);
        }
        match self.entries.iter_mut().find(|e| e.key() == key) {
            Some(existing) if *existing != record => {
                *existing = record;
                true
            }
            _ => false,
        }
    }
}

impl<T: Keyed + Clone> HistoryBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    /// The most recent `n` records, oldest first
    pub fn tail(&self, n: usize) -> Vec<T> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }
}
