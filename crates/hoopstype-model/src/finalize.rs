// Production fit: one K-means run whose cluster ids are named as player types.

use std::collections::BTreeMap;

use hoopstype_core::table::{PlayerTable, Value};
use tracing::info;

use crate::error::ModelError;
use crate::kmeans::{self, KMeansParams};
use crate::mapping::{resolve_label, UnmappedLabel};
use crate::scaling::scaled_features;

#[derive(Debug, Clone)]
pub struct FinalFitParams {
    pub feature_columns: Vec<String>,
    pub kmeans: KMeansParams,
    pub seed: u64,
    pub n_clusters: usize,
    /// Cluster id to player-type name, expected to cover `0..n_clusters`.
    pub label_map: BTreeMap<usize, String>,
    pub on_unmapped: UnmappedLabel,
    /// Name of the label column this stage appends.
    pub player_type_column: String,
}

/// The labeled table plus what reporting needs from the fit.
#[derive(Debug, Clone)]
pub struct FinalFit {
    /// Input rows with the player-type label appended. Numeric cluster ids
    /// are not part of the table.
    pub table: PlayerTable,
    pub assignments: Vec<usize>,
    pub inertia: f64,
    /// Cluster centres in feature units, for naming the player types.
    pub centroids: Vec<Vec<f64>>,
    pub feature_columns: Vec<String>,
    pub player_type_column: String,
}

impl FinalFit {
    /// (x, y, player type) per row, for a two-feature scatter of the result.
    pub fn scatter_points(&self, x: &str, y: &str) -> Result<Vec<(f64, f64, String)>, ModelError> {
        let xs = self.table.numeric_column(x)?;
        let ys = self.table.numeric_column(y)?;
        let labels = self.table.column_values(&self.player_type_column)?;
        Ok(xs
            .into_iter()
            .zip(ys)
            .zip(labels)
            .map(|((x, y), label)| (x, y, label.to_string()))
            .collect())
    }

    /// Members per cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &cluster in &self.assignments {
            sizes[cluster] += 1;
        }
        sizes
    }
}

/// Fit `n_clusters` once and append each row's player-type label.
pub fn finalize(features: &PlayerTable, params: &FinalFitParams) -> Result<FinalFit, ModelError> {
    params.kmeans.validate()?;
    if features.has_column(&params.player_type_column) {
        return Err(ModelError::ColumnCollision {
            column: params.player_type_column.clone(),
        });
    }
    let (scaled, scaler) = scaled_features(features, &params.feature_columns)?;
    let fit = kmeans::fit(&scaled, params.n_clusters, &params.kmeans, params.seed)?;

    let labels = fit
        .labels
        .iter()
        .map(|cluster| {
            resolve_label(&params.label_map, cluster, &params.on_unmapped, "player type").map(Value::Text)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut table = features.clone();
    table.set_column(&params.player_type_column, labels)?;
    info!(
        "Final fit: {} players in {} clusters, inertia {:.4}",
        table.len(),
        params.n_clusters,
        fit.inertia
    );

    let centroids = fit
        .centroids
        .iter()
        .map(|c| scaler.inverse_transform_point(c))
        .collect();
    Ok(FinalFit {
        table,
        assignments: fit.labels,
        inertia: fit.inertia,
        centroids,
        feature_columns: params.feature_columns.clone(),
        player_type_column: params.player_type_column.clone(),
    })
}
