// Conversion of the labeled table into `results` rows and bulk insert.

use std::path::Path;

use anyhow::{Context, Result};
use hoopstype_core::config::Config;
use hoopstype_core::db::{Database, PersistedPlayerRow};
use hoopstype_core::table::{PlayerTable, TableError, Value, PLAYER_ID};
use hoopstype_model::stability::round_to;
use tracing::{debug, info};

/// Decimal places kept for rate and percentage columns.
const STORED_DIGITS: u32 = 2;

/// Names of the table columns whose names come from configuration.
#[derive(Debug, Clone)]
pub struct PersistColumns {
    pub season: String,
    pub year: String,
    pub team: String,
    pub player_type: String,
    pub ppm: String,
    pub apm: String,
    pub rpm: String,
    pub bpm: String,
    pub spm: String,
    pub tpm: String,
}

impl PersistColumns {
    pub fn from_config(config: &Config) -> Self {
        Self {
            season: config.acquire.season_col.clone(),
            year: config.clean.year_col.clone(),
            team: config.clean.team_col.clone(),
            player_type: config.final_fit.player_type_col.clone(),
            ppm: config.featurize.ppm_col.clone(),
            apm: config.featurize.apm_col.clone(),
            rpm: config.featurize.rpm_col.clone(),
            bpm: config.featurize.bpm_col.clone(),
            spm: config.featurize.spm_col.clone(),
            tpm: config.featurize.tpm_col.clone(),
        }
    }
}

/// Height in inches. Accepts `"6-5"` style feet-inches strings or a number;
/// anything else is 0.
pub fn parse_height_inches(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        Value::Text(s) => {
            let Some((feet, inches)) = s.trim().split_once('-') else {
                return 0;
            };
            match (feet.trim().parse::<i64>(), inches.trim().parse::<i64>()) {
                (Ok(feet), Ok(inches)) => feet * 12 + inches,
                _ => 0,
            }
        }
        _ => 0,
    }
}

/// Read-only view of one table row with defaults for absent columns.
struct RowView<'a> {
    table: &'a PlayerTable,
    row: usize,
}

impl RowView<'_> {
    fn value(&self, column: &str) -> Option<&Value> {
        self.table.get(self.row, column).filter(|v| !v.is_missing())
    }

    fn text(&self, column: &str) -> String {
        self.value(column).map(Value::to_string).unwrap_or_default()
    }

    fn int(&self, column: &str) -> i64 {
        self.value(column)
            .and_then(Value::as_f64)
            .filter(|f| f.is_finite())
            .map_or(0, |f| f.trunc() as i64)
    }

    fn float(&self, column: &str) -> f64 {
        self.value(column).and_then(Value::as_f64).unwrap_or(0.0)
    }

    fn rounded(&self, column: &str) -> f64 {
        round_to(self.float(column), STORED_DIGITS)
    }
}

/// One `PersistedPlayerRow` per table row. Only `player_id` is required;
/// other absent columns become 0 or an empty string.
pub fn rows_from_table(
    table: &PlayerTable,
    columns: &PersistColumns,
) -> Result<Vec<PersistedPlayerRow>, TableError> {
    table.require_column(PLAYER_ID)?;

    let rows = (0..table.len())
        .map(|row| {
            let r = RowView { table, row };
            PersistedPlayerRow {
                player_id: r.text(PLAYER_ID),
                player_name: r.text("name"),
                season: r.text(&columns.season),
                year: r.text(&columns.year),
                position: r.text("position"),
                height: r.value("height").map_or(0, parse_height_inches),
                weight: r.int("weight"),
                player_type: r.text(&columns.player_type),
                team: r.text(&columns.team),
                conference: r.text("conference"),
                games: r.int("games_played"),
                games_started: r.int("games_started"),
                fg_pct: r.rounded("field_goal_percentage"),
                fg_pct3: r.rounded("three_point_percentage"),
                ft_pct: r.rounded("free_throw_percentage"),
                points: r.int("points"),
                ppm: r.rounded(&columns.ppm),
                assists: r.int("assists"),
                apm: r.rounded(&columns.apm),
                a_perc: r.rounded("assist_percentage"),
                rebounds: r.int("total_rebounds"),
                rpm: r.rounded(&columns.rpm),
                r_perc: r.rounded("total_rebound_percentage"),
                blocks: r.int("blocks"),
                bpm: r.rounded(&columns.bpm),
                b_perc: r.rounded("block_percentage"),
                steals: r.int("steals"),
                spm: r.rounded(&columns.spm),
                s_perc: r.rounded("steal_percentage"),
                turnovers: r.int("turnovers"),
                tpm: r.rounded(&columns.tpm),
                t_perc: r.rounded("turnover_percentage"),
                usage: r.float("usage_percentage"),
                efficiency: r.float("player_efficiency_rating"),
            }
        })
        .collect();
    Ok(rows)
}

/// Load the labeled CSV at `load_path` and insert every row into `db`.
/// With `replace`, rows from earlier runs are deleted first. Returns the
/// number of rows written.
pub fn populate(
    db: &Database,
    load_path: &Path,
    columns: &PersistColumns,
    replace: bool,
) -> Result<usize> {
    let table = PlayerTable::from_csv_path(load_path)
        .with_context(|| format!("failed to load labeled data from {}", load_path.display()))?;
    info!(
        "Cleaned data with cluster labels loaded from {}",
        load_path.display()
    );

    let rows = rows_from_table(&table, columns).context("labeled data is missing player ids")?;
    debug!("Converted {} table rows for insert", rows.len());
    if replace {
        db.clear_results()?;
        info!("Existing results cleared before import.");
    }
    let count = db.import_players(&rows)?;
    info!("{} rows of player data populated in database.", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELED: &str = "\
player_id,name,season,position,height,weight,points,total_rebounds,games_played,field_goal_percentage,usage_percentage,year,team,ppm,rpm,player_type
evan-mobley,Evan Mobley,2020-21,F,7-0,215,440,245,33,0.578,24.1234,Freshman,southern cal,0.4545454,0.2531,Rim Protector
cade-cunningham,Cade Cunningham,2020-21,G,6-8,220,537,169,27,0.438,28.5,Freshman,oklahoma state,0.5555555,0.1749,Scorer";

    fn columns() -> PersistColumns {
        PersistColumns {
            season: "season".into(),
            year: "year".into(),
            team: "team".into(),
            player_type: "player_type".into(),
            ppm: "ppm".into(),
            apm: "apm".into(),
            rpm: "rpm".into(),
            bpm: "bpm".into(),
            spm: "spm".into(),
            tpm: "tpm".into(),
        }
    }

    #[test]
    fn height_parsing() {
        assert_eq!(parse_height_inches(&Value::Text("6-5".into())), 77);
        assert_eq!(parse_height_inches(&Value::Text("7-0".into())), 84);
        assert_eq!(parse_height_inches(&Value::Int(80)), 80);
        assert_eq!(parse_height_inches(&Value::Float(79.0)), 79);
        assert_eq!(parse_height_inches(&Value::Text("tall".into())), 0);
        assert_eq!(parse_height_inches(&Value::Missing), 0);
    }

    #[test]
    fn rows_carry_labels_and_rounded_rates() {
        let table = PlayerTable::from_csv_reader(LABELED.as_bytes()).unwrap();
        let rows = rows_from_table(&table, &columns()).unwrap();
        assert_eq!(rows.len(), 2);

        let mobley = &rows[0];
        assert_eq!(mobley.player_id, "evan-mobley");
        assert_eq!(mobley.player_name, "Evan Mobley");
        assert_eq!(mobley.height, 84);
        assert_eq!(mobley.weight, 215);
        assert_eq!(mobley.games, 33);
        assert_eq!(mobley.rebounds, 245);
        assert_eq!(mobley.player_type, "Rim Protector");
        assert_eq!(mobley.team, "southern cal");
        assert_eq!(mobley.year, "Freshman");
        assert_eq!(mobley.ppm, 0.45);
        assert_eq!(mobley.rpm, 0.25);
        assert_eq!(mobley.fg_pct, 0.58);
        // Usage is stored unrounded
        assert_eq!(mobley.usage, 24.1234);

        assert_eq!(rows[1].ppm, 0.56);
        assert_eq!(rows[1].height, 80);
    }

    #[test]
    fn absent_columns_default() {
        let table = PlayerTable::from_csv_reader(LABELED.as_bytes()).unwrap();
        let rows = rows_from_table(&table, &columns()).unwrap();
        assert_eq!(rows[0].conference, "");
        assert_eq!(rows[0].steals, 0);
        assert_eq!(rows[0].apm, 0.0);
        assert_eq!(rows[0].efficiency, 0.0);
    }

    #[test]
    fn player_id_is_required() {
        let table = PlayerTable::from_csv_reader("name,points\nX,10".as_bytes()).unwrap();
        assert!(matches!(
            rows_from_table(&table, &columns()),
            Err(TableError::MissingColumn { .. })
        ));
    }

    #[test]
    fn populate_inserts_every_row() {
        let dir = std::env::temp_dir().join(format!("hoopstype_persist_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("labeled.csv");
        std::fs::write(&path, LABELED).unwrap();

        let db = Database::open(":memory:").unwrap();
        let count = populate(&db, &path, &columns(), false).unwrap();
        assert_eq!(count, 2);
        assert_eq!(db.player_count().unwrap(), 2);

        let scorers = db.players_by_type("Scorer", "ppm", 10).unwrap();
        assert_eq!(scorers.len(), 1);
        assert_eq!(scorers[0].player_id, "cade-cunningham");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn populate_with_replace_drops_earlier_rows() {
        let dir = std::env::temp_dir().join(format!("hoopstype_persist_replace_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("labeled.csv");
        std::fs::write(&path, LABELED).unwrap();

        let db = Database::open(":memory:").unwrap();
        let stale = rows_from_table(
            &PlayerTable::from_csv_reader("player_id,player_type
old-timer,Scorer".as_bytes()).unwrap(),
            &columns(),
        )
        .unwrap();
        db.import_players(&stale).unwrap();

        populate(&db, &path, &columns(), false).unwrap();
        assert_eq!(db.player_count().unwrap(), 3);

        let count = populate(&db, &path, &columns(), true).unwrap();
        assert_eq!(count, 2);
        assert_eq!(db.player_count().unwrap(), 2);
        assert!(db.player("old-timer").unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
