// SQLite persistence layer for clustered player results.

use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use rusqlite::{named_params, params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Columns a results listing may be ordered by. The sort column reaches SQL
/// by name, so anything outside this list is rejected.
pub const SORTABLE_COLUMNS: &[&str] = &[
    "player_name",
    "height",
    "weight",
    "games",
    "games_started",
    "fg_pct",
    "fg_pct3",
    "ft_pct",
    "points",
    "ppm",
    "assists",
    "apm",
    "a_perc",
    "rebounds",
    "rpm",
    "r_perc",
    "blocks",
    "bpm",
    "b_perc",
    "steals",
    "spm",
    "s_perc",
    "turnovers",
    "tpm",
    "t_perc",
    "usage",
    "efficiency",
];

/// One player's final row: raw and per-minute statistics plus the resolved
/// player type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPlayerRow {
    pub player_id: String,
    pub player_name: String,
    pub season: String,
    pub year: String,
    pub position: String,
    pub height: i64,
    pub weight: i64,
    pub player_type: String,
    pub team: String,
    pub conference: String,
    pub games: i64,
    pub games_started: i64,
    pub fg_pct: f64,
    pub fg_pct3: f64,
    pub ft_pct: f64,
    pub points: i64,
    pub ppm: f64,
    pub assists: i64,
    pub apm: f64,
    pub a_perc: f64,
    pub rebounds: i64,
    pub rpm: f64,
    pub r_perc: f64,
    pub blocks: i64,
    pub bpm: f64,
    pub b_perc: f64,
    pub steals: i64,
    pub spm: f64,
    pub s_perc: f64,
    pub turnovers: i64,
    pub tpm: f64,
    pub t_perc: f64,
    pub usage: f64,
    pub efficiency: f64,
}

const INSERT_RESULT: &str = "
    INSERT OR REPLACE INTO results (
        player_id, player_name, season, year, position, height, weight, player_type,
        team, conference, games, games_started, fg_pct, fg_pct3, ft_pct,
        points, ppm, assists, apm, a_perc, rebounds, rpm, r_perc,
        blocks, bpm, b_perc, steals, spm, s_perc, turnovers, tpm, t_perc,
        usage, efficiency
    ) VALUES (
        :player_id, :player_name, :season, :year, :position, :height, :weight, :player_type,
        :team, :conference, :games, :games_started, :fg_pct, :fg_pct3, :ft_pct,
        :points, :ppm, :assists, :apm, :a_perc, :rebounds, :rpm, :r_perc,
        :blocks, :bpm, :b_perc, :steals, :spm, :s_perc, :turnovers, :tpm, :t_perc,
        :usage, :efficiency
    )";

const SELECT_RESULT: &str = "
    SELECT player_id, player_name, season, year, position, height, weight, player_type,
           team, conference, games, games_started, fg_pct, fg_pct3, ft_pct,
           points, ppm, assists, apm, a_perc, rebounds, rpm, r_perc,
           blocks, bpm, b_perc, steals, spm, s_perc, turnovers, tpm, t_perc,
           usage, efficiency
    FROM results";

/// SQLite-backed store for the `results` table.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the results
    /// table exists. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS results (
                player_id     TEXT PRIMARY KEY,
                player_name   TEXT NOT NULL,
                season        TEXT NOT NULL,
                year          TEXT NOT NULL,
                position      TEXT NOT NULL,
                height        INTEGER NOT NULL,
                weight        INTEGER NOT NULL,
                player_type   TEXT NOT NULL,
                team          TEXT NOT NULL,
                conference    TEXT NOT NULL,
                games         INTEGER NOT NULL,
                games_started INTEGER NOT NULL,
                fg_pct        REAL NOT NULL,
                fg_pct3       REAL NOT NULL,
                ft_pct        REAL NOT NULL,
                points        INTEGER NOT NULL,
                ppm           REAL NOT NULL,
                assists       INTEGER NOT NULL,
                apm           REAL NOT NULL,
                a_perc        REAL NOT NULL,
                rebounds      INTEGER NOT NULL,
                rpm           REAL NOT NULL,
                r_perc        REAL NOT NULL,
                blocks        INTEGER NOT NULL,
                bpm           REAL NOT NULL,
                b_perc        REAL NOT NULL,
                steals        INTEGER NOT NULL,
                spm           REAL NOT NULL,
                s_perc        REAL NOT NULL,
                turnovers     INTEGER NOT NULL,
                tpm           REAL NOT NULL,
                t_perc        REAL NOT NULL,
                usage         REAL NOT NULL,
                efficiency    REAL NOT NULL,
                populated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_results_player_type ON results(player_type);
            ",
        )
        .context("failed to create database schema")?;
        debug!("results schema ready in {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Insert all players in a single transaction. Re-inserting a
    /// `player_id` replaces its row. Returns the number of rows written.
    pub fn import_players(&self, players: &[PersistedPlayerRow]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for player in players {
            insert_with(&tx, player)
                .with_context(|| format!("failed to insert player {}", player.player_id))?;
        }

        tx.commit().context("failed to commit import")?;
        Ok(players.len())
    }

    /// Players of one type ordered by `sort_col` descending, at most `limit`
    /// rows. `sort_col` must be one of [`SORTABLE_COLUMNS`].
    pub fn players_by_type(
        &self,
        player_type: &str,
        sort_col: &str,
        limit: usize,
    ) -> Result<Vec<PersistedPlayerRow>> {
        if !SORTABLE_COLUMNS.contains(&sort_col) {
            bail!("cannot sort results by unknown column `{sort_col}`");
        }
        let conn = self.conn();
        let sql = format!(
            "{SELECT_RESULT} WHERE player_type = ?1 ORDER BY {sort_col} DESC, player_id LIMIT ?2"
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare players_by_type query")?;

        let players = stmt
            .query_map(params![player_type, limit as i64], row_to_player)
            .context("failed to query results")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map result rows")?;

        Ok(players)
    }

    /// Look up a single player by id.
    pub fn player(&self, player_id: &str) -> Result<Option<PersistedPlayerRow>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!("{SELECT_RESULT} WHERE player_id = ?1"))
            .context("failed to prepare player query")?;
        let mut rows = stmt
            .query_map(params![player_id], row_to_player)
            .context("failed to query player")?;

        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read player row")?)),
            None => Ok(None),
        }
    }

    /// Distinct player types present in the table, alphabetically.
    pub fn player_types(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT DISTINCT player_type FROM results ORDER BY player_type")
            .context("failed to prepare player_types query")?;
        let types = stmt
            .query_map([], |row| row.get(0))
            .context("failed to query player types")?
            .collect::<std::result::Result<Vec<String>, _>>()
            .context("failed to map player types")?;
        Ok(types)
    }

    pub fn player_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))
            .context("failed to count results")?;
        Ok(count as usize)
    }

    /// Delete every row from the results table.
    pub fn clear_results(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM results", [])
            .context("failed to clear results")?;
        Ok(())
    }
}

fn insert_with(conn: &Connection, p: &PersistedPlayerRow) -> rusqlite::Result<usize> {
    conn.execute(
        INSERT_RESULT,
        named_params! {
            ":player_id": p.player_id,
            ":player_name": p.player_name,
            ":season": p.season,
            ":year": p.year,
            ":position": p.position,
            ":height": p.height,
            ":weight": p.weight,
            ":player_type": p.player_type,
            ":team": p.team,
            ":conference": p.conference,
            ":games": p.games,
            ":games_started": p.games_started,
            ":fg_pct": p.fg_pct,
            ":fg_pct3": p.fg_pct3,
            ":ft_pct": p.ft_pct,
            ":points": p.points,
            ":ppm": p.ppm,
            ":assists": p.assists,
            ":apm": p.apm,
            ":a_perc": p.a_perc,
            ":rebounds": p.rebounds,
            ":rpm": p.rpm,
            ":r_perc": p.r_perc,
            ":blocks": p.blocks,
            ":bpm": p.bpm,
            ":b_perc": p.b_perc,
            ":steals": p.steals,
            ":spm": p.spm,
            ":s_perc": p.s_perc,
            ":turnovers": p.turnovers,
            ":tpm": p.tpm,
            ":t_perc": p.t_perc,
            ":usage": p.usage,
            ":efficiency": p.efficiency,
        },
    )
}

fn row_to_player(row: &Row<'_>) -> rusqlite::Result<PersistedPlayerRow> {
    Ok(PersistedPlayerRow {
        player_id: row.get("player_id")?,
        player_name: row.get("player_name")?,
        season: row.get("season")?,
        year: row.get("year")?,
        position: row.get("position")?,
        height: row.get("height")?,
        weight: row.get("weight")?,
        player_type: row.get("player_type")?,
        team: row.get("team")?,
        conference: row.get("conference")?,
        games: row.get("games")?,
        games_started: row.get("games_started")?,
        fg_pct: row.get("fg_pct")?,
        fg_pct3: row.get("fg_pct3")?,
        ft_pct: row.get("ft_pct")?,
        points: row.get("points")?,
        ppm: row.get("ppm")?,
        assists: row.get("assists")?,
        apm: row.get("apm")?,
        a_perc: row.get("a_perc")?,
        rebounds: row.get("rebounds")?,
        rpm: row.get("rpm")?,
        r_perc: row.get("r_perc")?,
        blocks: row.get("blocks")?,
        bpm: row.get("bpm")?,
        b_perc: row.get("b_perc")?,
        steals: row.get("steals")?,
        spm: row.get("spm")?,
        s_perc: row.get("s_perc")?,
        turnovers: row.get("turnovers")?,
        tpm: row.get("tpm")?,
        t_perc: row.get("t_perc")?,
        usage: row.get("usage")?,
        efficiency: row.get("efficiency")?,
    })
}
