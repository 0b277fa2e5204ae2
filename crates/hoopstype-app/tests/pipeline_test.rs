// End-to-end run over a synthetic season extract: config -> clustering ->
// reports -> labeled CSV -> SQLite.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use hoopstype_app::persist::{populate, PersistColumns};
use hoopstype_app::pipeline::{get_clusters, run_clustering, PipelineParams};
use hoopstype_app::report;
use hoopstype_core::config::{parse_config, Config};
use hoopstype_core::db::Database;
use hoopstype_core::table::{PlayerTable, Value};

/// Per-minute (points, assists, rebounds, blocks, steals, turnovers).
const ARCHETYPES: [[f64; 6]; 5] = [
    [0.60, 0.05, 0.10, 0.01, 0.02, 0.05],
    [0.30, 0.20, 0.10, 0.01, 0.05, 0.08],
    [0.25, 0.03, 0.35, 0.10, 0.01, 0.04],
    [0.40, 0.08, 0.20, 0.03, 0.06, 0.05],
    [0.15, 0.05, 0.12, 0.02, 0.02, 0.03],
];
const PER_ARCHETYPE: usize = 8;

fn default_config() -> Config {
    let text = include_str!("../../../defaults/pipeline.toml");
    parse_config(text, Path::new("defaults/pipeline.toml")).unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hoopstype_it_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Forty eligible players plus rows every filter should remove.
fn raw_csv() -> String {
    let mut csv_data = String::from(
        "player_id,name,season,team_abbreviation,minutes_played,height,points,assists,total_rebounds,blocks,steals,turnovers\n",
    );
    for (a, rates) in ARCHETYPES.iter().enumerate() {
        for i in 0..PER_ARCHETYPE {
            let id = format!("player-{a}-{i}");
            let minutes = 300.0 + 20.0 * i as f64;
            let scale = 1.0 + 0.02 * i as f64;
            let counts: Vec<String> = rates
                .iter()
                .map(|r| format!("{}", (r * scale * minutes).round()))
                .collect();
            writeln!(
                csv_data,
                "{id},Player {a}{i},2020-21,team-{a},{minutes},6-{},{}",
                i + 1,
                counts.join(",")
            )
            .unwrap();
            if i == 0 {
                // Earlier season: counts toward experience, never kept itself
                writeln!(csv_data, "{id},Player {a}{i},2019-20,team-{a},500,6-1,1,1,1,1,1,1").unwrap();
            }
        }
    }
    for season in ["2017-18", "2018-19", "2019-20", "2020-21"] {
        writeln!(csv_data, "veteran,Old Hand,{season},duke,900,6-6,300,90,150,10,30,40").unwrap();
    }
    csv_data.push_str("benchwarmer,Deep Bench,2020-21,iowa,40,6-2,10,2,5,0,1,2\n");
    csv_data
}

fn raw_table() -> PlayerTable {
    PlayerTable::from_csv_reader(raw_csv().as_bytes()).unwrap()
}

#[test]
fn clustering_run_covers_every_stage() {
    let params = PipelineParams::from_config(&default_config()).unwrap();
    let run = run_clustering(&raw_table(), &params).unwrap();

    assert_eq!(run.eligible_players, ARCHETYPES.len() * PER_ARCHETYPE);
    assert_eq!(run.sweep.ks(), (2..11).collect::<Vec<_>>());
    assert_eq!(run.sweep.sse().len(), 9);
    assert!((0.0..=100.0).contains(&run.stability.percent_agreement));
    assert_eq!(run.stability.total, 40);

    let fit = &run.final_fit;
    assert_eq!(fit.table.len(), 40);
    assert_eq!(fit.cluster_sizes().iter().sum::<usize>(), 40);
    let names: Vec<&String> = params.final_fit.label_map.values().collect();
    for row in 0..fit.table.len() {
        let label = fit.table.get(row, "player_type").and_then(Value::as_text).unwrap();
        assert!(names.iter().any(|n| n.as_str() == label), "unexpected label {label}");
    }
    let ids = fit.table.column_values("player_id").unwrap();
    assert!(ids.iter().all(|v| v.to_string().starts_with("player-")));
}

#[test]
fn clustering_is_reproducible() {
    let params = PipelineParams::from_config(&default_config()).unwrap();
    let a = run_clustering(&raw_table(), &params).unwrap();
    let b = run_clustering(&raw_table(), &params).unwrap();
    assert_eq!(a.sweep, b.sweep);
    assert_eq!(a.stability, b.stability);
    assert_eq!(a.final_fit.assignments, b.final_fit.assignments);
}

#[test]
fn get_clusters_then_populate_round_trips_through_sqlite() {
    let dir = temp_dir("end_to_end");
    let raw_path = dir.join("raw.csv");
    let save_path = dir.join("out").join("labeled.csv");
    std::fs::write(&raw_path, raw_csv()).unwrap();

    let mut config = default_config();
    config.data.report_dir = dir.join("reports").to_string_lossy().into_owned();

    let run = get_clusters(&config, &raw_path, &save_path).unwrap();
    assert!(save_path.exists());
    for name in [
        report::SWEEP_JSON,
        report::SWEEP_CSV,
        report::STABILITY_CSV,
        report::CLUSTERS_CSV,
        report::CENTROIDS_CSV,
    ] {
        assert!(dir.join("reports").join(name).exists(), "missing {name}");
    }

    let saved = PlayerTable::from_csv_path(&save_path).unwrap();
    assert_eq!(saved.len(), run.final_fit.table.len());
    assert!(saved.has_column("player_type"));
    assert!(saved.has_column("ppm"));
    assert!(!saved.has_column("team_abbreviation"));

    let db = Database::open(":memory:").unwrap();
    let count = populate(&db, &save_path, &PersistColumns::from_config(&config), true).unwrap();
    assert_eq!(count, 40);
    assert_eq!(db.player_count().unwrap(), 40);

    let first = db.player("player-0-0").unwrap().unwrap();
    assert_eq!(first.season, "2020-21");
    assert_eq!(first.year, "Sophomore");
    assert_eq!(first.team, "team 0");
    assert_eq!(first.height, 73);
    assert!(!first.player_type.is_empty());

    let types = db.player_types().unwrap();
    let listed: usize = types
        .iter()
        .map(|t| db.players_by_type(t, "ppm", 100).unwrap().len())
        .sum();
    assert_eq!(listed, 40);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_raw_file_fails_with_path() {
    let dir = temp_dir("missing");
    let err = get_clusters(&default_config(), &dir.join("nope.csv"), &dir.join("out.csv")).unwrap_err();
    assert!(format!("{err:#}").contains("nope.csv"));
    let _ = std::fs::remove_dir_all(&dir);
}
