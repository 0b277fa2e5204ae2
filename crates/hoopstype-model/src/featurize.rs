// Per-minute rate features derived from counting statistics.

use hoopstype_core::table::{
    PlayerTable, Value, ASSISTS, BLOCKS, MINUTES_PLAYED, POINTS, STEALS, TOTAL_REBOUNDS, TURNOVERS,
};
use tracing::info;

use crate::error::ModelError;

/// Output column names for the six rates. The caller owns the naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureColumns {
    pub points_per_minute: String,
    pub assists_per_minute: String,
    pub rebounds_per_minute: String,
    pub blocks_per_minute: String,
    pub steals_per_minute: String,
    pub turnovers_per_minute: String,
}

impl FeatureColumns {
    /// (counting stat, output column) pairs in output order.
    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            (POINTS, self.points_per_minute.as_str()),
            (ASSISTS, self.assists_per_minute.as_str()),
            (TOTAL_REBOUNDS, self.rebounds_per_minute.as_str()),
            (BLOCKS, self.blocks_per_minute.as_str()),
            (STEALS, self.steals_per_minute.as_str()),
            (TURNOVERS, self.turnovers_per_minute.as_str()),
        ]
    }
}

/// Append `stat / minutes_played` for each of the six counting stats.
///
/// No rows are added or removed and existing columns are untouched, unless
/// an output name equals an existing column, in which case it is replaced.
/// Cleaning guarantees `minutes_played > 0`.
pub fn featurize(table: &PlayerTable, columns: &FeatureColumns) -> Result<PlayerTable, ModelError> {
    let minutes = table.numeric_column(MINUTES_PLAYED)?;
    let mut df = table.clone();
    for (stat, output) in columns.pairs() {
        let rates = table
            .numeric_column(stat)?
            .into_iter()
            .zip(&minutes)
            .map(|(count, mins)| Value::Float(count / mins))
            .collect();
        df.set_column(output, rates)?;
    }
    info!("New features for statistics per minute calculated.");
    Ok(df)
}
