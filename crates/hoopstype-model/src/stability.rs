// Reseeded-run agreement for a chosen cluster count.

use std::collections::BTreeMap;

use hoopstype_core::table::PlayerTable;
use serde::Serialize;
use tracing::info;

use crate::error::ModelError;
use crate::kmeans::{self, KMeansParams};
use crate::mapping::{resolve_cluster, UnmappedCluster};
use crate::scaling::scaled_features;

#[derive(Debug, Clone)]
pub struct StabilityParams {
    pub feature_columns: Vec<String>,
    pub kmeans: KMeansParams,
    /// Seed of the reference run.
    pub seed_a: u64,
    /// Seed of the comparison run.
    pub seed_b: u64,
    pub n_clusters: usize,
    /// Comparison-run cluster id to reference-run cluster id.
    pub correspondence: BTreeMap<usize, usize>,
    pub on_unmapped: UnmappedCluster,
    pub round_digits: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityReport {
    /// Share of players with the same aligned assignment, in percent.
    pub percent_agreement: f64,
    pub changed: usize,
    pub total: usize,
}

/// Round half away from zero to `digits` decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Fit `n_clusters` twice with different seeds on the same standardized
/// features and report how many players keep their cluster once the second
/// run's ids are translated through `correspondence`.
pub fn stability(features: &PlayerTable, params: &StabilityParams) -> Result<StabilityReport, ModelError> {
    params.kmeans.validate()?;
    let (scaled, _) = scaled_features(features, &params.feature_columns)?;

    let run_a = kmeans::fit(&scaled, params.n_clusters, &params.kmeans, params.seed_a)?;
    let run_b = kmeans::fit(&scaled, params.n_clusters, &params.kmeans, params.seed_b)?;

    let mut changed = 0;
    for (&a, &b) in run_a.labels.iter().zip(&run_b.labels) {
        match resolve_cluster(&params.correspondence, b, params.on_unmapped)? {
            Some(aligned) if aligned == a => {}
            _ => changed += 1,
        }
    }
    let total = run_a.labels.len();
    let agreement = (total - changed) as f64 / total as f64;
    let percent_agreement = round_to(100.0 * agreement, params.round_digits);
    info!(
        "Percent of players that stayed in their cluster: {}% ({} of {} changed)",
        percent_agreement, changed, total
    );

    Ok(StabilityReport {
        percent_agreement,
        changed,
        total,
    })
}
