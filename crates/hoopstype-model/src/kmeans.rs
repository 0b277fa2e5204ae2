// Seeded K-means (Lloyd iterations) with k-means++ or random initialization.
//
// A fit is a pure function of (points, n_clusters, params, seed): one StdRng
// is seeded per call and every restart draws from it in turn.

use std::fmt;
use std::str::FromStr;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::ModelError;

/// Relative tolerance on centroid movement, scaled by mean feature variance.
const TOLERANCE: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStrategy {
    KMeansPlusPlus,
    Random,
}

impl FromStr for InitStrategy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "k-means++" => Ok(InitStrategy::KMeansPlusPlus),
            "random" => Ok(InitStrategy::Random),
            other => Err(ModelError::UnknownInit(other.to_string())),
        }
    }
}

impl fmt::Display for InitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStrategy::KMeansPlusPlus => write!(f, "k-means++"),
            InitStrategy::Random => write!(f, "random"),
        }
    }
}

/// Hyperparameters shared by every fit in a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KMeansParams {
    pub init: InitStrategy,
    /// Independent restarts; the lowest-inertia restart is kept.
    pub n_init: usize,
    /// Lloyd iteration cap per restart.
    pub max_iter: usize,
}

impl KMeansParams {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_init == 0 {
            return Err(ModelError::InvalidParameter {
                name: "n_init",
                message: "must be at least 1".into(),
            });
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Outcome of one K-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFit {
    /// Cluster id in `0..n_clusters` for each input point.
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
    /// Lloyd iterations run by the winning restart.
    pub n_iter: usize,
}

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

/// Fit `n_clusters` centroids to `points`.
pub fn fit(
    points: &[Vec<f64>],
    n_clusters: usize,
    params: &KMeansParams,
    seed: u64,
) -> Result<ClusterFit, ModelError> {
    params.validate()?;
    if points.is_empty() {
        return Err(ModelError::EmptyFeatures);
    }
    if n_clusters == 0 || n_clusters > points.len() {
        return Err(ModelError::InvalidClusterCount {
            n_clusters,
            n_samples: points.len(),
        });
    }

    let tol = TOLERANCE * mean_variance(points);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<ClusterFit> = None;
    for restart in 0..params.n_init {
        let initial = match params.init {
            InitStrategy::KMeansPlusPlus => kmeans_plus_plus_init(points, n_clusters, &mut rng),
            InitStrategy::Random => random_init(points, n_clusters, &mut rng),
        };
        let candidate = lloyd(points, initial, params.max_iter, tol);
        debug!(
            "k={} restart {} converged in {} iterations, inertia {:.4}",
            n_clusters, restart, candidate.n_iter, candidate.inertia
        );
        // Strict comparison keeps the earliest restart on ties
        if best.as_ref().map_or(true, |b| candidate.inertia < b.inertia) {
            best = Some(candidate);
        }
    }
    best.ok_or_else(|| ModelError::InvalidParameter {
        name: "n_init",
        message: "must be at least 1".into(),
    })
}

fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iter: usize, tol: f64) -> ClusterFit {
    let k = centroids.len();
    let mut labels: Vec<usize> = Vec::new();
    let mut n_iter = 0;

    for iter in 1..=max_iter {
        n_iter = iter;
        let (assigned, _) = assign(points, &centroids);
        let stable = assigned == labels;
        labels = assigned;

        let mut updated = compute_centroids(points, &labels, k);
        relocate_empty(points, &labels, &centroids, &mut updated);

        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, (new, _))| squared_distance(old, new))
            .sum();
        centroids = updated.into_iter().map(|(centroid, _)| centroid).collect();
        if stable || shift <= tol {
            break;
        }
    }

    let (labels, inertia) = assign(points, &centroids);
    ClusterFit {
        labels,
        centroids,
        inertia,
        n_iter,
    }
}

/// First centre uniform, later centres drawn proportional to squared distance
/// from the nearest centre already chosen.
fn kmeans_plus_plus_init<R: Rng + ?Sized>(points: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut chosen = Vec::with_capacity(k);
    chosen.push(rng.gen_range(0..n));
    let mut min_distances = vec![f64::INFINITY; n];

    while chosen.len() < k {
        let last = &points[chosen[chosen.len() - 1]];
        for (i, point) in points.iter().enumerate() {
            let d = squared_distance(point, last);
            if d < min_distances[i] {
                min_distances[i] = d;
            }
        }
        let next = match WeightedIndex::new(&min_distances) {
            Ok(weights) => weights.sample(rng),
            // Every point sits on a chosen centre
            Err(_) => (0..n).find(|i| !chosen.contains(i)).unwrap_or(0),
        };
        chosen.push(next);
    }

    chosen.into_iter().map(|i| points[i].clone()).collect()
}

fn random_init<R: Rng + ?Sized>(points: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    rand::seq::index::sample(rng, points.len(), k)
        .into_iter()
        .map(|i| points[i].clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Nearest centroid per point (ties to the lowest index) and total inertia.
fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels = points
        .iter()
        .map(|point| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (j, centroid) in centroids.iter().enumerate() {
                let d = squared_distance(point, centroid);
                if d < best_distance {
                    best = j;
                    best_distance = d;
                }
            }
            inertia += best_distance;
            best
        })
        .collect();
    (labels, inertia)
}

/// Mean of each cluster's members, paired with the member count.
fn compute_centroids(points: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<(Vec<f64>, usize)> {
    let dims = points[0].len();
    let mut sums = vec![(vec![0.0; dims], 0usize); k];
    for (point, &cluster) in points.iter().zip(labels) {
        let (sum, count) = &mut sums[cluster];
        *count += 1;
        for (s, v) in sum.iter_mut().zip(point) {
            *s += v;
        }
    }
    for (sum, count) in sums.iter_mut() {
        if *count > 0 {
            let n = *count as f64;
            sum.iter_mut().for_each(|s| *s /= n);
        }
    }
    sums
}

/// Move each empty cluster onto the point farthest from its current centroid.
fn relocate_empty(
    points: &[Vec<f64>],
    labels: &[usize],
    previous: &[Vec<f64>],
    updated: &mut [(Vec<f64>, usize)],
) {
    let empty: Vec<usize> = (0..updated.len()).filter(|&j| updated[j].1 == 0).collect();
    if empty.is_empty() {
        return;
    }
    let mut by_distance: Vec<(usize, f64)> = points
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(i, (point, &cluster))| (i, squared_distance(point, &previous[cluster])))
        .collect();
    by_distance.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for (j, (i, _)) in empty.into_iter().zip(by_distance) {
        updated[j] = (points[i].clone(), 1);
    }
}

fn mean_variance(points: &[Vec<f64>]) -> f64 {
    let n = points.len() as f64;
    let dims = points[0].len();
    if dims == 0 {
        return 0.0;
    }
    let total: f64 = (0..dims)
        .map(|d| {
            let mean = points.iter().map(|p| p[d]).sum::<f64>() / n;
            points.iter().map(|p| (p[d] - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / dims as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> KMeansParams {
        KMeansParams {
            init: InitStrategy::KMeansPlusPlus,
            n_init: 10,
            max_iter: 300,
        }
    }

    /// Three tight groups around (0,0), (10,10) and (0,10).
    fn blobs() -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
            for (dx, dy) in [(0.1, 0.0), (-0.1, 0.0), (0.0, 0.1), (0.0, -0.1)] {
                points.push(vec![cx + dx, cy + dy]);
            }
        }
        points
    }

    #[test]
    fn init_strategy_parses_and_displays() {
        assert_eq!("k-means++".parse::<InitStrategy>().unwrap(), InitStrategy::KMeansPlusPlus);
        assert_eq!("random".parse::<InitStrategy>().unwrap(), InitStrategy::Random);
        assert_eq!(InitStrategy::KMeansPlusPlus.to_string(), "k-means++");
        let err = "kmeans".parse::<InitStrategy>().unwrap_err();
        assert!(matches!(err, ModelError::UnknownInit(ref s) if s == "kmeans"));
    }

    #[test]
    fn separates_well_spaced_blobs() {
        let points = blobs();
        let fit = fit(&points, 3, &params(), 42).unwrap();

        assert_eq!(fit.labels.len(), 12);
        for group in fit.labels.chunks(4) {
            assert!(group.iter().all(|&l| l == group[0]));
        }
        assert_ne!(fit.labels[0], fit.labels[4]);
        assert_ne!(fit.labels[0], fit.labels[8]);
        assert_ne!(fit.labels[4], fit.labels[8]);
        // Each point is 0.1 from its group mean
        assert!((fit.inertia - 12.0 * 0.01).abs() < 1e-9);
    }

    #[test]
    fn random_init_also_separates_blobs() {
        let mut p = params();
        p.init = InitStrategy::Random;
        p.n_init = 30;
        let fit = fit(&blobs(), 3, &p, 7).unwrap();
        assert!((fit.inertia - 0.12).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_fit() {
        let points = blobs();
        let a = fit(&points, 4, &params(), 3).unwrap();
        let b = fit(&points, 4, &params(), 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_cluster_centroid_is_the_mean() {
        let points = vec![vec![1.0, 2.0], vec![3.0, 6.0]];
        let fit = fit(&points, 1, &params(), 0).unwrap();
        assert_eq!(fit.labels, vec![0, 0]);
        assert_eq!(fit.centroids, vec![vec![2.0, 4.0]]);
        assert!((fit.inertia - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn one_cluster_per_point_has_zero_inertia() {
        let points = vec![vec![0.0], vec![1.0], vec![5.0]];
        let fit = fit(&points, 3, &params(), 11).unwrap();
        assert_eq!(fit.inertia, 0.0);
        let mut labels = fit.labels.clone();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn labels_stay_in_range() {
        let points = blobs();
        for k in 1..=6 {
            let fit = fit(&points, k, &params(), 42).unwrap();
            assert!(fit.labels.iter().all(|&l| l < k));
            assert_eq!(fit.centroids.len(), k);
        }
    }

    #[test]
    fn invalid_cluster_counts_are_rejected() {
        let points = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            fit(&points, 0, &params(), 1),
            Err(ModelError::InvalidClusterCount { n_clusters: 0, n_samples: 2 })
        ));
        assert!(matches!(
            fit(&points, 3, &params(), 1),
            Err(ModelError::InvalidClusterCount { n_clusters: 3, n_samples: 2 })
        ));
    }

    #[test]
    fn zero_restarts_or_iterations_are_rejected() {
        let points = vec![vec![0.0], vec![1.0]];
        let mut p = params();
        p.n_init = 0;
        assert!(matches!(
            fit(&points, 1, &p, 1),
            Err(ModelError::InvalidParameter { name: "n_init", .. })
        ));
        let mut p = params();
        p.max_iter = 0;
        assert!(matches!(
            fit(&points, 1, &p, 1),
            Err(ModelError::InvalidParameter { name: "max_iter", .. })
        ));
    }

    #[test]
    fn duplicate_points_do_not_stall_initialization() {
        let points = vec![vec![1.0, 1.0]; 4];
        let fit = fit(&points, 2, &params(), 5).unwrap();
        assert_eq!(fit.inertia, 0.0);
        assert!(fit.labels.iter().all(|&l| l < 2));
    }
}
