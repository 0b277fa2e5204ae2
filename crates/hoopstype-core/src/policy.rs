// Policies for lookups whose key has no entry in a caller-supplied map.

use serde::Deserialize;

/// What to do when a value has no label in a string-valued map (experience
/// year to class, cluster id to player type).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedLabel {
    /// Abort the stage with an error naming the key.
    Fail,
    /// Write this string in place of the missing label.
    Sentinel(String),
}

/// What to do when a cluster id from the comparison run has no entry in the
/// correspondence map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedCluster {
    Fail,
    /// The record is compared as "changed".
    CountAsChanged,
}
