use serde::{Deserialize, Serialize};

use crate::records::IndicatorSnapshot;

/// Indicator column order used before the server has announced names
pub const DEFAULT_FEATURE_NAMES: [&str; 7] = [
    "ADX_L",
    "AROON_DIFF_S",
    "BOL_WIDTH_M",
    "CMMA_S",
    "DTR_RSI_M",
    "PCO_10_20",
    "PV_FIT_M",
];

/// Positional indicator names.
///
/// `values[i]` of an indicator snapshot belongs to `names[i]`. The list is
/// only replaced when the server announces a different one, so readers can
/// compare by hash cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureNames {
    names: Vec<String>,
    hash: Option<String>,
}

impl Default for FeatureNames {
    fn default() -> Self {
        FeatureNames {
            names: DEFAULT_FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            hash: None,
        }
    }
}

impl FeatureNames {
    pub fn new(names: Vec<String>) -> Self {
        FeatureNames { names, hash: None }
    }

    /// Adopt an announced list. Returns true if the cache changed.
    ///
    /// Empty lists are ignored.
    pub fn update(&mut self, names: &[String], hash: Option<&str>) -> bool {
        if names.is_empty() || self.names.as_slice() == names {
            if let Some(h) = hash
                && self.hash.as_deref() != Some(h)
            {
                self.hash = Some(h.to_string());
            }
            return false;
        }
        self.names = names.to_vec();
        self.hash = hash.map(str::to_string);
        true
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Look up a named value in a snapshot.
    ///
    /// Names carried on the snapshot itself take precedence over the cache.
    pub fn value_of(&self, snapshot: &IndicatorSnapshot, name: &str) -> Option<f64> {
        let index = match &snapshot.feature_names {
            Some(own) => own.iter().position(|n| n == name)?,
            None => self.index_of(name)?,
        };
        snapshot.value_at(index)
    }

    /// Pair each name with its value, by position
    pub fn zip<'a>(&'a self, snapshot: &'a IndicatorSnapshot) -> Vec<(&'a str, Option<f64>)> {
        let names = snapshot.feature_names.as_deref().unwrap_or(&self.names);
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), snapshot.value_at(i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_update_only_when_changed() {
        let mut cache = FeatureNames::new(names(&["a", "b"]));
        assert!(!cache.update(&names(&["a", "b"]), None));
        assert!(!cache.update(&[], None));
        assert!(cache.update(&names(&["b", "a"]), Some("h2")));
        assert_eq!(cache.names(), names(&["b", "a"]).as_slice());
        assert_eq!(cache.hash(), Some("h2"));
    }

    #[test]
    fn test_value_alignment_by_position() {
        let cache = FeatureNames::new(names(&["x", "y", "z"]));
        let snap = IndicatorSnapshot::new(1, vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.value_of(&snap, "y"), Some(2.0));
        assert_eq!(cache.value_of(&snap, "w"), None);

        let pairs = cache.zip(&snap);
        assert_eq!(pairs[2], ("z", Some(3.0)));
    }

    #[test]
    fn test_snapshot_names_take_precedence() {
        let cache = FeatureNames::new(names(&["x", "y"]));
        let snap = IndicatorSnapshot::new(1, vec![10.0, 20.0]).with_names(names(&["y", "x"]));
        assert_eq!(cache.value_of(&snap, "x"), Some(20.0));
    }

    #[test]
    fn test_default_names() {
        let cache = FeatureNames::default();
        assert_eq!(cache.len(), 7);
        assert_eq!(cache.index_of("CMMA_S"), Some(3));
    }
}
