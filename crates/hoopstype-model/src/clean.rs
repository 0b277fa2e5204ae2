// Eligible-population filtering for raw per-player-season rows.

use std::collections::{BTreeMap, HashMap};

use hoopstype_core::table::{PlayerTable, Value, MINUTES_PLAYED, PLAYER_ID, TEAM_ABBREVIATION};
use hoopstype_core::table::TableError;
use tracing::info;

use crate::error::ModelError;
use crate::mapping::{resolve_label, UnmappedLabel};

/// Everything `clean` needs, spelled out. Nothing is defaulted.
#[derive(Debug, Clone)]
pub struct CleanParams {
    /// The only season kept, compared against the season column's text.
    pub season: String,
    pub season_column: String,
    /// Name of the experience column this stage creates.
    pub year_column: String,
    /// Players with this many seasons or more are excluded.
    pub max_years: u32,
    pub year_to_class: BTreeMap<u32, String>,
    pub on_unmapped_year: UnmappedLabel,
    /// Rows must have strictly more minutes than this.
    pub min_minutes: f64,
    /// Name of the de-hyphenated team column this stage creates.
    pub team_column: String,
    pub na_fill_value: Value,
    pub columns_to_drop: Vec<String>,
}

/// Filter raw rows down to the eligible players of one season.
///
/// Experience is the number of rows a player has anywhere in `raw`, counted
/// before the season filter, so earlier seasons still count toward it.
/// The returned table has the experience column (as a class label) and the
/// team column appended, `columns_to_drop` removed, and missing cells filled.
pub fn clean(raw: &PlayerTable, params: &CleanParams) -> Result<PlayerTable, ModelError> {
    for column in [
        params.season_column.as_str(),
        PLAYER_ID,
        TEAM_ABBREVIATION,
        MINUTES_PLAYED,
    ] {
        raw.require_column(column)?;
    }
    if raw.has_column(&params.year_column) {
        return Err(ModelError::ColumnCollision {
            column: params.year_column.clone(),
        });
    }

    // Career length: seasons present per player in the unfiltered input.
    // Rows without an id belong to no player and get no experience, so the
    // experience filter drops them.
    let ids: Vec<Option<String>> = raw
        .column_values(PLAYER_ID)?
        .into_iter()
        .map(|v| (!v.is_missing()).then(|| v.to_string()))
        .collect();
    let mut seasons_played: HashMap<&str, i64> = HashMap::new();
    for id in ids.iter().flatten() {
        *seasons_played.entry(id.as_str()).or_insert(0) += 1;
    }
    let mut df = raw.clone();
    df.set_column(
        &params.year_column,
        ids.iter()
            .map(|id| match id {
                Some(id) => Value::Int(seasons_played[id.as_str()]),
                None => Value::Missing,
            })
            .collect(),
    )?;
    info!("New `{}` column created from seasons played.", params.year_column);

    let season_idx = df.require_column(&params.season_column)?;
    df.retain_rows(|_, row| row[season_idx].to_string() == params.season);
    info!(
        "Filtered to the {} season. {} players played total.",
        params.season,
        df.len()
    );

    let year_idx = df.require_column(&params.year_column)?;
    let max_years = i64::from(params.max_years);
    df.retain_rows(|_, row| row[year_idx].as_i64().is_some_and(|y| y < max_years));
    let classes = df
        .column_values(&params.year_column)?
        .into_iter()
        .map(|v| {
            let years = v.as_i64().and_then(|y| u32::try_from(y).ok()).unwrap_or(0);
            resolve_label(
                &params.year_to_class,
                &years,
                &params.on_unmapped_year,
                "experience class",
            )
            .map(Value::Text)
        })
        .collect::<Result<Vec<_>, _>>()?;
    df.set_column(&params.year_column, classes)?;
    info!(
        "Filtered on players with fewer than {} seasons. {} players remain.",
        params.max_years,
        df.len()
    );

    let teams = df
        .column_values(TEAM_ABBREVIATION)?
        .into_iter()
        .map(|v| match v {
            Value::Missing => Value::Missing,
            other => Value::Text(other.to_string().replace('-', " ")),
        })
        .collect();
    df.set_column(&params.team_column, teams)?;

    let minutes_idx = df.require_column(MINUTES_PLAYED)?;
    let mut keep = Vec::with_capacity(df.len());
    for (row, cells) in df.rows().iter().enumerate() {
        match &cells[minutes_idx] {
            Value::Missing => keep.push(false),
            cell => match cell.as_f64() {
                Some(minutes) => keep.push(minutes > params.min_minutes),
                None => {
                    return Err(TableError::NonNumeric {
                        column: MINUTES_PLAYED.to_string(),
                        row,
                    }
                    .into())
                }
            },
        }
    }
    df.retain_rows(|i, _| keep[i]);
    info!(
        "Filtered on players with more than {} minutes played. {} players remain.",
        params.min_minutes,
        df.len()
    );

    df.drop_columns(&params.columns_to_drop)?;
    df.fill_missing(&params.na_fill_value);
    info!("Completed table cleaning.");
    Ok(df)
}
