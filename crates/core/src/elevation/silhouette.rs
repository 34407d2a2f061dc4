//! Silhouette score for one-dimensional clusterings.

/// Mean silhouette coefficient of `labels` over `points` (euclidean distance).
///
/// For each point, `a` is the mean distance to the rest of its own cluster and
/// `b` the smallest mean distance to any other cluster; its coefficient is
/// `(b - a) / max(a, b)`, and `0` for points alone in their cluster.
///
/// Returns `0.0` when fewer than two clusters are populated.
pub fn silhouette_score(points: &[f64], labels: &[usize]) -> f64 {
    let n = points.len().min(labels.len());
    let k = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; k];
    for &label in &labels[..n] {
        sizes[label] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut distance_sums = vec![0.0; k];
    for i in 0..n {
        distance_sums.fill(0.0);
        for j in 0..n {
            distance_sums[labels[j]] += (points[i] - points[j]).abs();
        }

        let own = labels[i];
        if sizes[own] < 2 {
            continue;
        }
        let a = distance_sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| distance_sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let scale = a.max(b);
        if scale > 0.0 {
            total += (b - a) / scale;
        }
    }
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_well_separated_clusters_score_near_one() {
        let points = [0.0, 0.1, 10.0, 10.1];
        let score = silhouette_score(&points, &[0, 0, 1, 1]);
        assert!(score > 0.98, "score {score}");
    }

    #[test]
    fn test_known_value() {
        // Point 0: a = 1, b = mean(|0-4|, |0-5|) = 4.5 -> 1 - 1/4.5
        // Point 1: a = 1, b = mean(3, 4) = 3.5 -> 1 - 1/3.5
        // Point 2: a = 1, b = mean(4, 3) = 3.5 -> 1 - 1/3.5
        // Point 3: a = 1, b = mean(5, 4) = 4.5 -> 1 - 1/4.5
        let score = silhouette_score(&[0.0, 1.0, 4.0, 5.0], &[0, 0, 1, 1]);
        let expected = (2.0 * (1.0 - 1.0 / 4.5) + 2.0 * (1.0 - 1.0 / 3.5)) / 4.0;
        assert_abs_diff_eq!(score, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_split_scores_negative() {
        let score = silhouette_score(&[0.0, 10.0, 0.1, 10.1], &[0, 0, 1, 1]);
        assert!(score < 0.0);
    }

    #[test]
    fn test_singletons_and_single_cluster() {
        assert_eq!(silhouette_score(&[1.0, 2.0, 3.0], &[0, 0, 0]), 0.0);
        // Singleton clusters contribute zero but still count in the mean
        let score = silhouette_score(&[0.0, 0.0, 9.0], &[0, 0, 1]);
        assert_abs_diff_eq!(score, 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(silhouette_score(&[], &[]), 0.0);
    }
}
