//! One-dimensional k-means
//!
//! Lloyd iterations from k-means++ seeds, repeated `n_init` times with the best
//! (lowest inertia) run kept. The generator is seeded from [`KMeansConfig::seed`]
//! so identical inputs always produce identical labels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Tuning for [`fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Independent seeded restarts; the lowest-inertia run wins
    pub n_init: usize,
    /// Lloyd iteration cap per restart
    pub max_iter: usize,
    /// Convergence threshold on squared centroid shift, relative to data variance
    pub tolerance: f64,
    /// Random seed for k-means++ initialisation
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 0,
        }
    }
}

/// Result of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster label per input point
    pub labels: Vec<usize>,
    /// Cluster centres, indexed by label
    pub centroids: Vec<f64>,
    /// Sum of squared distances to the assigned centre
    pub inertia: f64,
}

impl KMeansFit {
    /// Cost score: negative inertia, higher is better.
    pub fn score(&self) -> f64 {
        -self.inertia
    }
}

/// Number of distinct values in `points`.
pub fn distinct_count(points: &[f64]) -> usize {
    super::unique_elevations(points).len()
}

/// Partition `points` into `k` clusters.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidClusterCount`] unless `1 <= k <= distinct points`.
pub fn fit(points: &[f64], k: usize, config: &KMeansConfig) -> Result<KMeansFit> {
    let unique = distinct_count(points);
    if k == 0 || k > unique {
        return Err(MonitorError::InvalidClusterCount { k, unique });
    }

    let mean = points.iter().sum::<f64>() / points.len() as f64;
    let variance = points.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / points.len() as f64;
    let threshold = config.tolerance * variance;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<KMeansFit> = None;
    for _ in 0..config.n_init.max(1) {
        let seeds = plus_plus_seeds(points, k, &mut rng);
        let run = lloyd(points, seeds, config.max_iter, threshold);
        if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }
    best.ok_or(MonitorError::InvalidClusterCount { k, unique })
}

/// k-means++ seeding: each next centre is drawn with probability proportional
/// to its squared distance from the nearest centre already chosen.
fn plus_plus_seeds(points: &[f64], k: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())]);

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| nearest(*p, &centroids).1)
            .collect();
        let total: f64 = weights.iter().sum();
        if !total.is_finite() {
            // Squared distances overflowed; sampling is undefined
            centroids.push(farthest_point(points, &centroids));
            continue;
        }
        let chosen = if total > 0.0 {
            let threshold = rng.random_range(0.0..total);
            let mut cumulative = 0.0;
            weights
                .iter()
                .position(|w| {
                    cumulative += w;
                    cumulative > threshold
                })
                .unwrap_or_else(|| weights.iter().rposition(|w| *w > 0.0).unwrap_or(0))
        } else {
            0
        };
        centroids.push(points[chosen]);
    }
    centroids
}

fn lloyd(points: &[f64], mut centroids: Vec<f64>, max_iter: usize, threshold: f64) -> KMeansFit {
    let k = centroids.len();
    let mut labels = vec![0; points.len()];

    for _ in 0..max_iter {
        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest(*p, &centroids).0;
        }

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (label, p) in labels.iter().zip(points) {
            sums[*label] += p;
            counts[*label] += 1;
        }

        let mut updated = centroids.clone();
        for c in 0..k {
            if counts[c] > 0 {
                updated[c] = sums[c] / counts[c] as f64;
            } else {
                // Empty cluster: move it onto the worst-served point
                updated[c] = farthest_point(points, &centroids);
            }
        }

        let shift: f64 = updated
            .iter()
            .zip(&centroids)
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        centroids = updated;
        if shift <= threshold {
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, p) in labels.iter_mut().zip(points) {
        let (c, d2) = nearest(*p, &centroids);
        *label = c;
        inertia += d2;
    }
    KMeansFit {
        labels,
        centroids,
        inertia,
    }
}

/// Index of and squared distance to the nearest centre; ties go to the lower index.
fn nearest(point: f64, centroids: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d2 = (point - c).powi(2);
        if d2 < best.1 {
            best = (i, d2);
        }
    }
    best
}

fn farthest_point(points: &[f64], centroids: &[f64]) -> f64 {
    points
        .iter()
        .copied()
        .max_by(|a, b| nearest(*a, centroids).1.total_cmp(&nearest(*b, centroids).1))
        .unwrap_or(0.0)
}
