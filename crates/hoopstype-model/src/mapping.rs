// Caller-supplied lookups with an explicit policy for absent keys.

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::ModelError;

pub use hoopstype_core::policy::{UnmappedCluster, UnmappedLabel};

/// Resolve `key` to its label, or apply `policy` when the map has no entry.
/// `what` names the map in the error.
pub fn resolve_label<K>(
    map: &BTreeMap<K, String>,
    key: &K,
    policy: &UnmappedLabel,
    what: &'static str,
) -> Result<String, ModelError>
where
    K: Ord + Display,
{
    match (map.get(key), policy) {
        (Some(label), _) => Ok(label.clone()),
        (None, UnmappedLabel::Sentinel(sentinel)) => Ok(sentinel.clone()),
        (None, UnmappedLabel::Fail) => Err(ModelError::UnmappedKey {
            what,
            key: key.to_string(),
        }),
    }
}

/// Translate a comparison-run cluster id into the reference run's numbering.
/// `Ok(None)` means the id is unmapped and the policy tolerates it.
pub fn resolve_cluster(
    correspondence: &BTreeMap<usize, usize>,
    cluster: usize,
    policy: UnmappedCluster,
) -> Result<Option<usize>, ModelError> {
    match (correspondence.get(&cluster), policy) {
        (Some(&mapped), _) => Ok(Some(mapped)),
        (None, UnmappedCluster::CountAsChanged) => Ok(None),
        (None, UnmappedCluster::Fail) => Err(ModelError::UnmappedKey {
            what: "cluster correspondence",
            key: cluster.to_string(),
        }),
    }
}
