// Cluster-count sweep: SSE and silhouette for each candidate k.
//
// The output is diagnostic. Picking the production k is left to whoever
// reads the elbow and silhouette curves.

use hoopstype_core::table::PlayerTable;
use serde::Serialize;
use tracing::info;

use crate::error::ModelError;
use crate::kmeans::{self, KMeansParams};
use crate::scaling::scaled_features;
use crate::silhouette::silhouette_score;

#[derive(Debug, Clone)]
pub struct SweepParams {
    /// Inclusive lower bound on k.
    pub min_k: usize,
    /// Exclusive upper bound on k.
    pub max_k: usize,
    pub feature_columns: Vec<String>,
    pub kmeans: KMeansParams,
    /// Reused unchanged for every k.
    pub seed: u64,
}

impl SweepParams {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.min_k < 2 {
            return Err(ModelError::InvalidParameter {
                name: "min_k",
                message: format!("must be at least 2, got {}", self.min_k),
            });
        }
        if self.max_k <= self.min_k {
            return Err(ModelError::InvalidParameter {
                name: "max_k",
                message: format!("must exceed min_k ({}), got {}", self.min_k, self.max_k),
            });
        }
        self.kmeans.validate()
    }
}

/// Metrics for one candidate cluster count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub k: usize,
    pub sse: f64,
    pub silhouette: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterSweep {
    pub points: Vec<SweepPoint>,
}

impl ClusterSweep {
    pub fn ks(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.k).collect()
    }

    pub fn sse(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.sse).collect()
    }

    pub fn silhouette(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.silhouette).collect()
    }
}

/// Fit K-means for every k in `min_k..max_k` on freshly standardized
/// features and record inertia and mean silhouette for each.
pub fn sweep(features: &PlayerTable, params: &SweepParams) -> Result<ClusterSweep, ModelError> {
    params.validate()?;
    let (scaled, _) = scaled_features(features, &params.feature_columns)?;

    let mut result = ClusterSweep::default();
    for k in params.min_k..params.max_k {
        let fit = kmeans::fit(&scaled, k, &params.kmeans, params.seed)?;
        let silhouette = silhouette_score(&scaled, &fit.labels)?;
        info!("k={}: sse {:.4}, silhouette {:.4}", k, fit.inertia, silhouette);
        result.points.push(SweepPoint {
            k,
            sse: fit.inertia,
            silhouette,
        });
    }
    Ok(result)
}
