// Mean silhouette coefficient over all points, Euclidean distance.

use crate::error::ModelError;
use crate::kmeans::squared_distance;

/// Mean of `(b - a) / max(a, b)` over every point, where `a` is the mean
/// distance to the rest of its own cluster and `b` the smallest mean distance
/// to another cluster. Points alone in their cluster contribute 0.
///
/// Defined only for 2 to `n - 1` distinct labels.
pub fn silhouette_score(points: &[Vec<f64>], labels: &[usize]) -> Result<f64, ModelError> {
    let n = points.len();
    let n_slots = labels.iter().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; n_slots];
    for &label in labels {
        sizes[label] += 1;
    }
    let n_labels = sizes.iter().filter(|&&s| s > 0).count();
    let max = n.saturating_sub(1);
    if labels.len() != n || n_labels < 2 || n_labels > max {
        return Err(ModelError::SilhouetteUndefined { n_labels, max });
    }

    let mut total = 0.0;
    let mut distance_sums = vec![0.0; n_slots];
    for (i, point) in points.iter().enumerate() {
        distance_sums.iter_mut().for_each(|d| *d = 0.0);
        for (j, other) in points.iter().enumerate() {
            if i != j {
                distance_sums[labels[j]] += squared_distance(point, other).sqrt();
            }
        }

        let own = labels[i];
        if sizes[own] == 1 {
            continue;
        }
        let a = distance_sums[own] / (sizes[own] - 1) as f64;
        let b = (0..n_slots)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| distance_sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Ok(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_separated_clusters_score_near_one() {
        let points = vec![vec![0.0], vec![0.1], vec![10.0], vec![10.1]];
        let score = silhouette_score(&points, &[0, 0, 1, 1]).unwrap();
        assert!(score > 0.98, "score {score}");
    }

    #[test]
    fn hand_computed_value() {
        // Point 0: a = 1, b = (4 + 5) / 2 = 4.5, s = 3.5 / 4.5
        // Point 1: a = 1, b = (3 + 4) / 2 = 3.5, s = 2.5 / 3.5
        // Point 2: a = 1, b = (4 + 3) / 2 = 3.5, s = 2.5 / 3.5
        // Point 3: a = 1, b = (5 + 4) / 2 = 4.5, s = 3.5 / 4.5
        let points = vec![vec![0.0], vec![1.0], vec![4.0], vec![5.0]];
        let score = silhouette_score(&points, &[0, 0, 1, 1]).unwrap();
        let expected = (2.0 * 3.5 / 4.5 + 2.0 * 2.5 / 3.5) / 4.0;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn singleton_cluster_contributes_zero() {
        // Point 2 is alone; points 0 and 1: a = 1, b = 10 and 9
        let points = vec![vec![0.0], vec![1.0], vec![10.0]];
        let score = silhouette_score(&points, &[0, 0, 1]).unwrap();
        let expected = (9.0 / 10.0 + 8.0 / 9.0) / 3.0;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn score_is_bounded() {
        let points = vec![vec![0.0, 1.0], vec![3.0, 1.0], vec![0.5, 2.0], vec![2.5, 0.0], vec![1.0, 1.0]];
        let score = silhouette_score(&points, &[0, 1, 0, 1, 1]).unwrap();
        assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn undefined_for_one_label_or_all_singletons() {
        let points = vec![vec![0.0], vec![1.0], vec![2.0]];
        assert!(matches!(
            silhouette_score(&points, &[0, 0, 0]),
            Err(ModelError::SilhouetteUndefined { n_labels: 1, max: 2 })
        ));
        assert!(matches!(
            silhouette_score(&points, &[0, 1, 2]),
            Err(ModelError::SilhouetteUndefined { n_labels: 3, max: 2 })
        ));
    }
}
