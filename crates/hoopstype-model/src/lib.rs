// Player-type clustering engine: cleaning, per-minute features, K-means
// model selection, stability measurement, and final labeling.

pub mod clean;
pub mod error;
pub mod featurize;
pub mod finalize;
pub mod kmeans;
pub mod mapping;
pub mod scaling;
pub mod selection;
pub mod silhouette;
pub mod stability;

pub use error::ModelError;
