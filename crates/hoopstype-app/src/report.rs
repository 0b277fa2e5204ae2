// Report artifacts for a clustering run.
//
// These replace the elbow, silhouette and scatter plots: each is a plain
// table a plotting tool can read. A report that fails to write is logged
// and skipped; it never fails the run.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hoopstype_model::finalize::FinalFit;
use hoopstype_model::selection::ClusterSweep;
use hoopstype_model::stability::StabilityReport;
use serde::Serialize;
use tracing::{info, warn};

use crate::pipeline::ClusterRun;

pub const SWEEP_JSON: &str = "sweep.json";
pub const SWEEP_CSV: &str = "sweep.csv";
pub const STABILITY_CSV: &str = "stability.csv";
pub const CLUSTERS_CSV: &str = "clusters.csv";
pub const CENTROIDS_CSV: &str = "centroids.csv";

#[derive(Debug, Serialize)]
struct StabilityRow {
    perc_similar: f64,
    changed: usize,
    total: usize,
}

/// Write every report under `dir` and return the paths that succeeded.
pub fn write_reports(dir: &Path, run: &ClusterRun, scatter_x: &str, scatter_y: &str) -> Vec<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("Report directory {} could not be created: {}", dir.display(), e);
        return Vec::new();
    }

    let mut written = Vec::new();
    let mut record = |name: &str, result: Result<()>| {
        let path = dir.join(name);
        match result {
            Ok(()) => {
                info!("Report saved to {}", path.display());
                written.push(path);
            }
            Err(e) => warn!("Report {} could not be written: {:#}", path.display(), e),
        }
    };

    record(SWEEP_JSON, write_sweep_json(&dir.join(SWEEP_JSON), &run.sweep));
    record(SWEEP_CSV, write_sweep_csv(&dir.join(SWEEP_CSV), &run.sweep));
    record(STABILITY_CSV, write_stability_csv(&dir.join(STABILITY_CSV), &run.stability));
    record(
        CLUSTERS_CSV,
        write_scatter_csv(&dir.join(CLUSTERS_CSV), &run.final_fit, scatter_x, scatter_y),
    );
    record(CENTROIDS_CSV, write_centroids_csv(&dir.join(CENTROIDS_CSV), &run.final_fit));
    written
}

pub fn write_sweep_json(path: &Path, sweep: &ClusterSweep) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, sweep).context("failed to serialize sweep")?;
    Ok(())
}

/// One row per k: `k,sse,silhouette`.
pub fn write_sweep_csv(path: &Path, sweep: &ClusterSweep) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for point in &sweep.points {
        wtr.serialize(point)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_stability_csv(path: &Path, report: &StabilityReport) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.serialize(StabilityRow {
        perc_similar: report.percent_agreement,
        changed: report.changed,
        total: report.total,
    })?;
    wtr.flush()?;
    Ok(())
}

/// `x,y,player_type` per player, headed with the two feature names.
pub fn write_scatter_csv(path: &Path, fit: &FinalFit, x: &str, y: &str) -> Result<()> {
    let points = fit.scatter_points(x, y)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([x, y, fit.player_type_column.as_str()])?;
    for (px, py, label) in points {
        wtr.write_record([px.to_string(), py.to_string(), label])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Cluster centres in feature units with member counts and the player type
/// each cluster was given.
pub fn write_centroids_csv(path: &Path, fit: &FinalFit) -> Result<()> {
    let labels = fit.table.column_values(&fit.player_type_column)?;
    let mut names = vec![String::new(); fit.centroids.len()];
    for (&cluster, label) in fit.assignments.iter().zip(labels) {
        if names[cluster].is_empty() {
            names[cluster] = label.to_string();
        }
    }

    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec![
        "cluster".to_string(),
        fit.player_type_column.clone(),
        "size".to_string(),
    ];
    header.extend(fit.feature_columns.iter().cloned());
    wtr.write_record(&header)?;

    for (cluster, (centroid, size)) in fit.centroids.iter().zip(fit.cluster_sizes()).enumerate() {
        let mut record = vec![cluster.to_string(), names[cluster].clone(), size.to_string()];
        record.extend(centroid.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}
