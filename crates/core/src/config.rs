//! Run-time configuration of the monitor pipeline.

use serde::{Deserialize, Serialize};

use crate::elevation::KMeansConfig;

/// Default number of snapshots kept by [`crate::Monitor`].
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Parameters threaded through one pipeline pass.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// User override for the number of elevation levels; `None` uses the
    /// silhouette-selected default
    pub elevation_groups: Option<usize>,
    /// Clustering parameters
    pub kmeans: KMeansConfig,
    /// Snapshots memoised by content; 0 disables the cache
    pub cache_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            elevation_groups: None,
            kmeans: KMeansConfig::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl MonitorConfig {
    /// Same config with a fixed level count.
    pub fn with_elevation_groups(mut self, k: usize) -> Self {
        self.elevation_groups = Some(k);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.elevation_groups, None);
        assert_eq!(config.kmeans.n_init, 10);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.with_elevation_groups(4).elevation_groups, Some(4));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"elevation_groups": 3, "kmeans": {"seed": 7}}"#).unwrap();
        assert_eq!(config.elevation_groups, Some(3));
        assert_eq!(config.kmeans.seed, 7);
        assert_eq!(config.kmeans.n_init, KMeansConfig::default().n_init);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }
}
