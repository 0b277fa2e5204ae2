// Configuration loading and parsing (pipeline.toml).

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::policy::{UnmappedCluster, UnmappedLabel};

/// Initialization strategy names accepted in `[kmeans].init`.
pub const INIT_STRATEGIES: &[&str] = &["k-means++", "random"];

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataPaths,
    pub acquire: AcquireConfig,
    pub clean: CleanConfig,
    pub featurize: FeaturizeConfig,
    pub kmeans: KMeansConfig,
    pub sweep: SweepConfig,
    pub stability: StabilityConfig,
    pub final_fit: FinalFitConfig,
    pub db_path: String,
    pub max_rows: usize,
}

// ---------------------------------------------------------------------------
// pipeline.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pipeline.toml file.
#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    data: DataPaths,
    acquire: AcquireConfig,
    clean: RawClean,
    featurize: FeaturizeConfig,
    kmeans: KMeansConfig,
    sweep: SweepConfig,
    stability: RawStability,
    final_fit: RawFinalFit,
    database: DatabaseSection,
    web: WebSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub raw_path: String,
    pub clean_path: String,
    pub report_dir: String,
}

/// Season selection shared with the acquisition step.
#[derive(Debug, Clone, Deserialize)]
pub struct AcquireConfig {
    pub season: String,
    pub season_col: String,
}

/// TOML table keys are always strings, so integer-keyed maps arrive raw and
/// are parsed during assembly.
#[derive(Debug, Clone, Deserialize)]
struct RawClean {
    year_col: String,
    max_years: u32,
    min_minutes: f64,
    team_col: String,
    na_fill_value: f64,
    drop_columns: Vec<String>,
    year_mapping: HashMap<String, String>,
    on_unmapped_year: UnmappedLabel,
}

#[derive(Debug, Clone)]
pub struct CleanConfig {
    pub year_col: String,
    pub max_years: u32,
    pub min_minutes: f64,
    pub team_col: String,
    pub na_fill_value: f64,
    pub drop_columns: Vec<String>,
    pub year_mapping: BTreeMap<u32, String>,
    pub on_unmapped_year: UnmappedLabel,
}

/// Output column names for the six per-minute rates.
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturizeConfig {
    pub ppm_col: String,
    pub apm_col: String,
    pub rpm_col: String,
    pub bpm_col: String,
    pub spm_col: String,
    pub tpm_col: String,
}

/// K-means settings shared by the sweep, stability check, and final fit.
#[derive(Debug, Clone, Deserialize)]
pub struct KMeansConfig {
    pub cluster_cols: Vec<String>,
    pub init: String,
    pub n_init: usize,
    pub max_iter: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub min_k: usize,
    pub max_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct RawStability {
    seed_b: u64,
    n_clusters: usize,
    round_digits: u32,
    correspondence: HashMap<String, usize>,
    on_unmapped: UnmappedCluster,
}

#[derive(Debug, Clone)]
pub struct StabilityConfig {
    pub seed_b: u64,
    pub n_clusters: usize,
    pub round_digits: u32,
    pub correspondence: BTreeMap<usize, usize>,
    pub on_unmapped: UnmappedCluster,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFinalFit {
    n_clusters: usize,
    player_type_col: String,
    scatter_x: String,
    scatter_y: String,
    label_map: HashMap<String, String>,
    on_unmapped: UnmappedLabel,
}

#[derive(Debug, Clone)]
pub struct FinalFitConfig {
    pub n_clusters: usize,
    pub player_type_col: String,
    pub scatter_x: String,
    pub scatter_y: String,
    pub label_map: BTreeMap<usize, String>,
    pub on_unmapped: UnmappedLabel,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WebSection {
    max_rows: usize,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/pipeline.toml` relative to
/// `base_dir`. Does not copy defaults; see `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("pipeline.toml");
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Parse and validate a pipeline.toml document. `path` is only used for
/// error reporting.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: PipelineFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let clean = CleanConfig {
        year_mapping: parse_keys(file.clean.year_mapping, "clean.year_mapping")?,
        year_col: file.clean.year_col,
        max_years: file.clean.max_years,
        min_minutes: file.clean.min_minutes,
        team_col: file.clean.team_col,
        na_fill_value: file.clean.na_fill_value,
        drop_columns: file.clean.drop_columns,
        on_unmapped_year: file.clean.on_unmapped_year,
    };

    let stability = StabilityConfig {
        correspondence: parse_keys(file.stability.correspondence, "stability.correspondence")?,
        seed_b: file.stability.seed_b,
        n_clusters: file.stability.n_clusters,
        round_digits: file.stability.round_digits,
        on_unmapped: file.stability.on_unmapped,
    };

    let final_fit = FinalFitConfig {
        label_map: parse_keys(file.final_fit.label_map, "final_fit.label_map")?,
        n_clusters: file.final_fit.n_clusters,
        player_type_col: file.final_fit.player_type_col,
        scatter_x: file.final_fit.scatter_x,
        scatter_y: file.final_fit.scatter_y,
        on_unmapped: file.final_fit.on_unmapped,
    };

    let config = Config {
        data: file.data,
        acquire: file.acquire,
        clean,
        featurize: file.featurize,
        kmeans: file.kmeans,
        sweep: file.sweep,
        stability,
        final_fit,
        db_path: file.database.path,
        max_rows: file.web.max_rows,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` with every file from `defaults/` it does not have yet.
/// `*.example` files stay behind. Returns the files created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    match (defaults_dir.is_dir(), config_dir.is_dir()) {
        (false, true) => return Ok(Vec::new()),
        (false, false) => {
            return Err(copy_error(format!(
                "no defaults/ or config/ directory under {}; run hoopstype from the project root",
                base_dir.display()
            )))
        }
        _ => {}
    }
    std::fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut sources: Vec<PathBuf> = std::fs::read_dir(&defaults_dir)
        .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map_or(true, |ext| ext != "example"))
        .collect();
    sources.sort();

    let mut created = Vec::new();
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| {
            copy_error(format!(
                "cannot copy {} to {}: {e}",
                source.display(),
                target.display()
            ))
        })?;
        info!("Copied default {} into config/", target.display());
        created.push(target);
    }
    Ok(created)
}

/// Load `config/pipeline.toml` under the working directory, seeding it from
/// `defaults/` first when missing.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_keys<K, V>(raw: HashMap<String, V>, field: &str) -> Result<BTreeMap<K, V>, ConfigError>
where
    K: FromStr + Ord,
{
    raw.into_iter()
        .map(|(k, v)| {
            k.trim()
                .parse::<K>()
                .map(|key| (key, v))
                .map_err(|_| ConfigError::ValidationError {
                    field: field.to_string(),
                    message: format!("key `{k}` is not a non-negative integer"),
                })
        })
        .collect()
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.acquire.season.trim().is_empty() {
        return Err(invalid("acquire.season", "must not be empty"));
    }

    // Clean validations
    let clean = &config.clean;
    if clean.max_years == 0 {
        return Err(invalid("clean.max_years", "must be greater than 0"));
    }
    if !clean.min_minutes.is_finite() || clean.min_minutes < 0.0 {
        return Err(invalid(
            "clean.min_minutes",
            format!("must be a finite value >= 0, got {}", clean.min_minutes),
        ));
    }
    if clean.year_col == config.acquire.season_col {
        return Err(invalid(
            "clean.year_col",
            "must differ from acquire.season_col",
        ));
    }
    if clean.year_mapping.is_empty() {
        return Err(invalid("clean.year_mapping", "must not be empty"));
    }

    // K-means validations
    let kmeans = &config.kmeans;
    if kmeans.cluster_cols.is_empty() {
        return Err(invalid("kmeans.cluster_cols", "must name at least one column"));
    }
    if !INIT_STRATEGIES.contains(&kmeans.init.as_str()) {
        return Err(invalid(
            "kmeans.init",
            format!("must be one of {INIT_STRATEGIES:?}, got `{}`", kmeans.init),
        ));
    }
    let positive: &[(&str, usize)] = &[
        ("kmeans.n_init", kmeans.n_init),
        ("kmeans.max_iter", kmeans.max_iter),
        ("stability.n_clusters", config.stability.n_clusters),
        ("final_fit.n_clusters", config.final_fit.n_clusters),
        ("web.max_rows", config.max_rows),
    ];
    for (name, val) in positive {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    // Sweep range: silhouette needs at least two clusters
    if config.sweep.min_k < 2 {
        return Err(invalid(
            "sweep.min_k",
            format!("must be >= 2, got {}", config.sweep.min_k),
        ));
    }
    if config.sweep.max_k <= config.sweep.min_k {
        return Err(invalid(
            "sweep.max_k",
            format!(
                "must be greater than sweep.min_k ({}), got {}",
                config.sweep.min_k, config.sweep.max_k
            ),
        ));
    }

    if config.stability.round_digits > 10 {
        return Err(invalid(
            "stability.round_digits",
            format!("must be <= 10, got {}", config.stability.round_digits),
        ));
    }

    if config.final_fit.label_map.is_empty() {
        return Err(invalid("final_fit.label_map", "must not be empty"));
    }
    if config.final_fit.player_type_col.trim().is_empty() {
        return Err(invalid("final_fit.player_type_col", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
