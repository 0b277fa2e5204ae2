// End-to-end clustering run: clean, featurize, then the three K-means stages
// over the same feature table.
//
// Config is translated once into explicit per-stage parameter structs. The
// model crate never reads the config itself.

use std::path::Path;

use anyhow::Context;
use hoopstype_core::config::Config;
use hoopstype_core::table::{PlayerTable, Value};
use hoopstype_model::clean::{clean, CleanParams};
use hoopstype_model::featurize::{featurize, FeatureColumns};
use hoopstype_model::finalize::{finalize, FinalFit, FinalFitParams};
use hoopstype_model::kmeans::{InitStrategy, KMeansParams};
use hoopstype_model::selection::{sweep, ClusterSweep, SweepParams};
use hoopstype_model::stability::{stability, StabilityParams, StabilityReport};
use hoopstype_model::ModelError;
use tracing::info;

use crate::report;

/// Every tunable of one pipeline run, grouped by stage.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    pub clean: CleanParams,
    pub features: FeatureColumns,
    pub sweep: SweepParams,
    pub stability: StabilityParams,
    pub final_fit: FinalFitParams,
}

impl PipelineParams {
    pub fn from_config(config: &Config) -> Result<Self, ModelError> {
        let kmeans = KMeansParams {
            init: config.kmeans.init.parse::<InitStrategy>()?,
            n_init: config.kmeans.n_init,
            max_iter: config.kmeans.max_iter,
        };
        let feature_columns = config.kmeans.cluster_cols.clone();
        let seed = config.kmeans.seed;

        Ok(Self {
            clean: CleanParams {
                season: config.acquire.season.clone(),
                season_column: config.acquire.season_col.clone(),
                year_column: config.clean.year_col.clone(),
                max_years: config.clean.max_years,
                year_to_class: config.clean.year_mapping.clone(),
                on_unmapped_year: config.clean.on_unmapped_year.clone(),
                min_minutes: config.clean.min_minutes,
                team_column: config.clean.team_col.clone(),
                na_fill_value: Value::Float(config.clean.na_fill_value),
                columns_to_drop: config.clean.drop_columns.clone(),
            },
            features: FeatureColumns {
                points_per_minute: config.featurize.ppm_col.clone(),
                assists_per_minute: config.featurize.apm_col.clone(),
                rebounds_per_minute: config.featurize.rpm_col.clone(),
                blocks_per_minute: config.featurize.bpm_col.clone(),
                steals_per_minute: config.featurize.spm_col.clone(),
                turnovers_per_minute: config.featurize.tpm_col.clone(),
            },
            sweep: SweepParams {
                min_k: config.sweep.min_k,
                max_k: config.sweep.max_k,
                feature_columns: feature_columns.clone(),
                kmeans: kmeans.clone(),
                seed,
            },
            stability: StabilityParams {
                feature_columns: feature_columns.clone(),
                kmeans: kmeans.clone(),
                seed_a: seed,
                seed_b: config.stability.seed_b,
                n_clusters: config.stability.n_clusters,
                correspondence: config.stability.correspondence.clone(),
                on_unmapped: config.stability.on_unmapped,
                round_digits: config.stability.round_digits,
            },
            final_fit: FinalFitParams {
                feature_columns,
                kmeans,
                seed,
                n_clusters: config.final_fit.n_clusters,
                label_map: config.final_fit.label_map.clone(),
                on_unmapped: config.final_fit.on_unmapped.clone(),
                player_type_column: config.final_fit.player_type_col.clone(),
            },
        })
    }
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct ClusterRun {
    /// Rows left after cleaning.
    pub eligible_players: usize,
    pub sweep: ClusterSweep,
    pub stability: StabilityReport,
    pub final_fit: FinalFit,
}

/// Run the stages in order. A failing stage aborts the run.
pub fn run_clustering(raw: &PlayerTable, params: &PipelineParams) -> anyhow::Result<ClusterRun> {
    let cleaned = clean(raw, &params.clean).context("cleaning failed")?;
    let features = featurize(&cleaned, &params.features).context("feature engineering failed")?;

    let sweep = sweep(&features, &params.sweep).context("cluster-count sweep failed")?;
    let stability = stability(&features, &params.stability).context("stability check failed")?;
    let final_fit = finalize(&features, &params.final_fit).context("final fit failed")?;

    Ok(ClusterRun {
        eligible_players: cleaned.len(),
        sweep,
        stability,
        final_fit,
    })
}

/// Load the raw extract, run the pipeline, write report artifacts under the
/// configured report directory, and save the labeled table to `save_path`.
pub fn get_clusters(config: &Config, load_path: &Path, save_path: &Path) -> anyhow::Result<ClusterRun> {
    let params = PipelineParams::from_config(config).context("invalid pipeline parameters")?;
    let raw = PlayerTable::from_csv_path(load_path)
        .with_context(|| format!("failed to load raw data from {}", load_path.display()))?;
    info!("Loaded {} raw rows from {}", raw.len(), load_path.display());

    let run = run_clustering(&raw, &params)?;

    let written = report::write_reports(
        Path::new(&config.data.report_dir),
        &run,
        &config.final_fit.scatter_x,
        &config.final_fit.scatter_y,
    );
    info!("{} report files written", written.len());

    if let Some(parent) = save_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    run.final_fit
        .table
        .write_csv_path(save_path)
        .with_context(|| format!("failed to save labeled data to {}", save_path.display()))?;
    info!("Cleaned data with cluster labels saved to {}", save_path.display());

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoopstype_core::config::parse_config;

    fn default_config() -> Config {
        let text = include_str!("../../../defaults/pipeline.toml");
        parse_config(text, Path::new("defaults/pipeline.toml")).unwrap()
    }

    #[test]
    fn from_config_shares_kmeans_settings_across_stages() {
        let params = PipelineParams::from_config(&default_config()).unwrap();
        assert_eq!(params.sweep.kmeans, params.stability.kmeans);
        assert_eq!(params.sweep.kmeans, params.final_fit.kmeans);
        assert_eq!(params.sweep.kmeans.init, InitStrategy::KMeansPlusPlus);
        assert_eq!(params.sweep.seed, params.stability.seed_a);
        assert_eq!(params.sweep.seed, params.final_fit.seed);
        assert_eq!(params.sweep.feature_columns.len(), 6);
    }

    #[test]
    fn from_config_maps_clean_and_feature_names() {
        let params = PipelineParams::from_config(&default_config()).unwrap();
        assert_eq!(params.clean.season, "2020-21");
        assert_eq!(params.clean.year_to_class.get(&1).map(String::as_str), Some("Freshman"));
        assert_eq!(params.clean.na_fill_value, Value::Float(0.0));
        assert_eq!(params.features.points_per_minute, "ppm");
        assert_eq!(params.final_fit.player_type_column, "player_type");
    }

    #[test]
    fn unknown_init_strategy_is_rejected() {
        let mut config = default_config();
        config.kmeans.init = "kmeans||".into();
        let err = PipelineParams::from_config(&config).unwrap_err();
        assert!(matches!(err, ModelError::UnknownInit(_)));
    }
}
