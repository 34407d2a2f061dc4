//! Bounded content-keyed snapshot cache
//!
//! Re-running the pipeline on byte-identical uploads with the same parameters
//! returns the stored snapshot. Keys are an `FxHasher` digest of every input and
//! config field; a hit is confirmed by comparing the stored inputs, so a hash
//! collision only costs a recomputation.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHasher};

use super::{MonitorInputs, RunSnapshot};
use crate::config::MonitorConfig;

struct Entry {
    inputs: MonitorInputs,
    config: MonitorConfig,
    snapshot: Arc<RunSnapshot>,
}

/// FIFO-evicting snapshot cache.
pub struct SnapshotCache {
    capacity: usize,
    entries: FxHashMap<u64, Entry>,
    order: VecDeque<u64>,
}

impl SnapshotCache {
    /// Cache holding at most `capacity` snapshots; 0 never stores anything.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored snapshot for exactly these inputs and config.
    pub fn get(&self, inputs: &MonitorInputs, config: &MonitorConfig) -> Option<Arc<RunSnapshot>> {
        self.entries
            .get(&content_key(inputs, config))
            .filter(|e| e.inputs == *inputs && e.config == *config)
            .map(|e| Arc::clone(&e.snapshot))
    }

    /// Store a snapshot, evicting the oldest entry when full.
    pub fn insert(&mut self, inputs: MonitorInputs, config: MonitorConfig, snapshot: Arc<RunSnapshot>) {
        if self.capacity == 0 {
            return;
        }
        let key = content_key(&inputs, &config);
        if !self.entries.contains_key(&key) {
            while self.order.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
            self.order.push_back(key);
        }
        self.entries.insert(
            key,
            Entry {
                inputs,
                config,
                snapshot,
            },
        );
    }

    /// Drop every stored snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Digest of all inputs and parameters that influence a snapshot.
pub fn content_key(inputs: &MonitorInputs, config: &MonitorConfig) -> u64 {
    let mut hasher = FxHasher::default();
    inputs.hrr.hash(&mut hasher);
    inputs.ctrl.hash(&mut hasher);
    inputs.devc.hash(&mut hasher);
    inputs.log.hash(&mut hasher);
    config.elevation_groups.hash(&mut hasher);
    config.kmeans.n_init.hash(&mut hasher);
    config.kmeans.max_iter.hash(&mut hasher);
    config.kmeans.tolerance.to_bits().hash(&mut hasher);
    config.kmeans.seed.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(log: &str) -> MonitorInputs {
        MonitorInputs {
            log: Some(log.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_key_tracks_content() {
        let config = MonitorConfig::default();
        assert_eq!(content_key(&inputs("a"), &config), content_key(&inputs("a"), &config));
        assert_ne!(content_key(&inputs("a"), &config), content_key(&inputs("b"), &config));
        assert_ne!(
            content_key(&inputs("a"), &config),
            content_key(&inputs("a"), &config.clone().with_elevation_groups(2))
        );
    }

    #[test]
    fn test_fifo_eviction() {
        let config = MonitorConfig::default();
        let mut cache = SnapshotCache::new(2);
        for log in ["a", "b", "c"] {
            cache.insert(inputs(log), config.clone(), Arc::new(RunSnapshot::default()));
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&inputs("a"), &config).is_none());
        assert!(cache.get(&inputs("b"), &config).is_some());
        assert!(cache.get(&inputs("c"), &config).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = SnapshotCache::new(0);
        cache.insert(inputs("a"), MonitorConfig::default(), Arc::new(RunSnapshot::default()));
        assert!(cache.is_empty());
    }
}
