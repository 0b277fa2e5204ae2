// Error taxonomy for the clustering engine.

use hoopstype_core::table::TableError;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Shape and schema problems in the input table (not tabular, missing
    /// column, non-numeric cell).
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("column `{column}` already exists and would be overwritten")]
    ColumnCollision { column: String },

    #[error("no {what} mapping for `{key}`")]
    UnmappedKey { what: &'static str, key: String },

    #[error("cannot fit {n_clusters} clusters to {n_samples} samples")]
    InvalidClusterCount { n_clusters: usize, n_samples: usize },

    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("unknown initialization strategy `{0}`")]
    UnknownInit(String),

    #[error("silhouette score needs 2..={max} distinct labels, got {n_labels}")]
    SilhouetteUndefined { n_labels: usize, max: usize },

    #[error("feature table has no rows")]
    EmptyFeatures,
}
