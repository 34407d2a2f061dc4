//! Elevation levels from device z-coordinates
//!
//! Devices are grouped into storeys by clustering their elevations. There is no
//! ground truth for the number of storeys, so the count is chosen automatically
//! as a default that a user can override.
//!
//! # Choosing `k`
//!
//! Candidates run over `2..unique`, where `unique` is the number of distinct
//! elevations; one cluster per elevation is never proposed. Starting from `k = 2`
//! the search keeps moving to `k + 1` while the silhouette score strictly
//! improves and stops at the first candidate that does not. A better score past
//! that first dip is deliberately not searched for.
//!
//! # Level numbering
//!
//! Cluster labels are arbitrary, so they are renumbered by elevation: walking the
//! points from lowest to highest, each label gets the next level the first time it
//! is seen. Level 0 is therefore the lowest group.

pub mod kmeans;
pub mod silhouette;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MonitorError, Result};
pub use kmeans::{KMeansConfig, KMeansFit};
pub use silhouette::silhouette_score;

/// Fewest distinct elevations for which a `k` search has any candidate.
pub const MIN_DISTINCT_ELEVATIONS: usize = 3;

/// Level assigned to one distinct elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationLevel {
    /// Elevation (m)
    pub z: f64,
    /// Ordinal level, 0 = lowest
    pub level: usize,
}

/// Scores of one candidate cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Cluster count
    pub k: usize,
    /// k-means cost score (negative inertia)
    pub score: f64,
    /// Mean silhouette coefficient
    pub silhouette: f64,
}

/// Identity of an elevation for deduplication and lookup; `-0.0` is `0.0`.
pub(crate) fn elevation_key(z: f64) -> u64 {
    if z == 0.0 {
        0.0_f64.to_bits()
    } else {
        z.to_bits()
    }
}

/// Distinct elevations in ascending order.
pub fn unique_elevations(z_values: &[f64]) -> Vec<f64> {
    let mut unique = z_values.to_vec();
    unique.sort_by(f64::total_cmp);
    unique.dedup_by(|a, b| elevation_key(*a) == elevation_key(*b));
    unique
}

/// Fit and score one candidate `k`.
///
/// # Errors
///
/// Propagates [`MonitorError::InvalidClusterCount`] from the fit.
pub fn score_candidate(z_values: &[f64], k: usize, config: &KMeansConfig) -> Result<CandidateScore> {
    let fit = kmeans::fit(z_values, k, config)?;
    let candidate = CandidateScore {
        k,
        score: fit.score(),
        silhouette: silhouette_score(z_values, &fit.labels),
    };
    debug!(
        k,
        score = candidate.score,
        silhouette = candidate.silhouette,
        "scored elevation candidate"
    );
    Ok(candidate)
}

/// Default level count for `z_values` (one entry per device; repeats weight the fit).
///
/// # Errors
///
/// Returns [`MonitorError::InsufficientData`] with fewer than
/// [`MIN_DISTINCT_ELEVATIONS`] distinct values.
pub fn select_k(z_values: &[f64], config: &KMeansConfig) -> Result<usize> {
    let unique = unique_elevations(z_values).len();
    if unique < MIN_DISTINCT_ELEVATIONS {
        return Err(MonitorError::InsufficientData {
            unique,
            required: MIN_DISTINCT_ELEVATIONS,
        });
    }

    let mut best = score_candidate(z_values, 2, config)?;
    for k in 3..unique {
        let candidate = score_candidate(z_values, k, config)?;
        if candidate.silhouette > best.silhouette {
            best = candidate;
        } else {
            break;
        }
    }
    Ok(best.k)
}

/// Assign a level to every distinct elevation using `k` clusters.
///
/// Rows come back in ascending `z`.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidClusterCount`] unless
/// `1 <= k <= distinct elevations`.
pub fn assign_levels(z_values: &[f64], k: usize, config: &KMeansConfig) -> Result<Vec<ElevationLevel>> {
    let fit = kmeans::fit(z_values, k, config)?;

    let mut order: Vec<usize> = (0..z_values.len()).collect();
    order.sort_by(|&a, &b| z_values[a].total_cmp(&z_values[b]));

    let mut level_of_label: FxHashMap<usize, usize> = FxHashMap::default();
    let mut rows: Vec<ElevationLevel> = Vec::new();
    for i in order {
        let next = level_of_label.len();
        let level = *level_of_label.entry(fit.labels[i]).or_insert(next);
        let z = z_values[i];
        if rows.last().is_none_or(|r| elevation_key(r.z) != elevation_key(z)) {
            rows.push(ElevationLevel { z, level });
        }
    }
    Ok(rows)
}

/// Lookup table from elevation key to level; see [`level_of`].
pub fn level_lookup(levels: &[ElevationLevel]) -> FxHashMap<u64, usize> {
    levels.iter().map(|l| (elevation_key(l.z), l.level)).collect()
}

/// Level of `z` in a table built by [`level_lookup`].
pub fn level_of(lookup: &FxHashMap<u64, usize>, z: f64) -> Option<usize> {
    lookup.get(&elevation_key(z)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> KMeansConfig {
        KMeansConfig::default()
    }

    #[test]
    fn test_ascending_z_gives_ascending_level() {
        let levels = assign_levels(&[10.0, 0.0, 5.0], 3, &config()).unwrap();
        assert_eq!(
            levels,
            vec![
                ElevationLevel { z: 0.0, level: 0 },
                ElevationLevel { z: 5.0, level: 1 },
                ElevationLevel { z: 10.0, level: 2 },
            ]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let z = [3.1, 0.3, 3.1, 0.3, 6.2, 0.4, 6.3];
        let levels = assign_levels(&z, 3, &config()).unwrap();
        let pairs: Vec<(f64, usize)> = levels.iter().map(|l| (l.z, l.level)).collect();
        assert_eq!(
            pairs,
            vec![(0.3, 0), (0.4, 0), (3.1, 1), (6.2, 2), (6.3, 2)]
        );
    }

    #[test]
    fn test_single_level() {
        let levels = assign_levels(&[1.0, 2.0, 2.0], 1, &config()).unwrap();
        assert!(levels.iter().all(|l| l.level == 0));
        assert_eq!(levels.len(), 2);
    }

    #[test]
    fn test_select_k_three_storeys() {
        let z = [0.0, 0.1, 0.2, 5.0, 5.1, 5.2, 10.0, 10.1, 10.2];
        assert_eq!(select_k(&z, &config()).unwrap(), 3);
    }

    #[test]
    fn test_select_k_range_excludes_unique_count() {
        // Three distinct values leave only k = 2 as a candidate
        let z = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        assert_eq!(select_k(&z, &config()).unwrap(), 2);
    }

    #[test]
    fn test_select_k_stops_at_first_dip() {
        // k=2 lumps {0,1,10,11} together; k=3 gives three tight pairs and
        // improves; k=4 has to split a pair into singletons and drops.
        let z = [0.0, 1.0, 10.0, 11.0, 30.0, 31.0];
        let scores: Vec<f64> = (2..6)
            .map(|k| score_candidate(&z, k, &config()).unwrap().silhouette)
            .collect();
        assert!(scores[1] > scores[0]);
        assert!(scores[2] <= scores[1]);
        assert_eq!(select_k(&z, &config()).unwrap(), 3);
    }

    #[test]
    fn test_select_k_insufficient_data() {
        assert!(matches!(
            select_k(&[1.0, 1.0, 2.0], &config()),
            Err(MonitorError::InsufficientData {
                unique: 2,
                required: 3
            })
        ));
        assert!(select_k(&[], &config()).is_err());
    }

    #[test]
    fn test_level_lookup() {
        let levels = assign_levels(&[0.0, 5.0, 10.0], 3, &config()).unwrap();
        let lookup = level_lookup(&levels);
        assert_eq!(level_of(&lookup, 5.0), Some(1));
        assert_eq!(level_of(&lookup, 7.5), None);
    }

    #[test]
    fn test_signed_zero_is_one_elevation() {
        let z = [-0.0, 0.0, 3.0];
        assert_eq!(unique_elevations(&z).len(), 2);
        assert!(matches!(
            select_k(&z, &config()),
            Err(MonitorError::InsufficientData { unique: 2, .. })
        ));

        let levels = assign_levels(&z, 2, &config()).unwrap();
        assert_eq!(levels.len(), 2);
        let lookup = level_lookup(&levels);
        assert_eq!(level_of(&lookup, -0.0), Some(0));
        assert_eq!(level_of(&lookup, 0.0), Some(0));
        assert_eq!(level_of(&lookup, 3.0), Some(1));
    }
}
