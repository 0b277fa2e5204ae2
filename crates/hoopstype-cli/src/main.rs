// hoopstype entry point.
//
// Subcommands:
// - create-db     create the SQLite results table
// - get-clusters  clean, featurize, cluster and label a raw season extract
// - populate-db   load a labeled CSV into the results table
// - query         list the top players of one type

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hoopstype_app::persist::{self, PersistColumns};
use hoopstype_app::pipeline;
use hoopstype_core::config;
use hoopstype_core::db::Database;
use tracing::info;

#[derive(Parser)]
#[command(name = "hoopstype")]
#[command(about = "Cluster college basketball players into player types", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the results database
    CreateDb {
        /// SQLite file path (default: [database].path)
        #[arg(long)]
        db_path: Option<String>,
    },
    /// Run the clustering pipeline and save the labeled table
    GetClusters {
        /// Raw season extract (default: [data].raw_path)
        #[arg(long)]
        loadpath: Option<PathBuf>,
        /// Where to save the labeled table (default: [data].clean_path)
        #[arg(long)]
        savepath: Option<PathBuf>,
    },
    /// Populate the database from a labeled table
    PopulateDb {
        /// SQLite file path (default: [database].path)
        #[arg(long)]
        db_path: Option<String>,
        /// Labeled table to load (default: [data].clean_path)
        #[arg(long)]
        loadpath: Option<PathBuf>,
        /// Delete rows from earlier runs before loading
        #[arg(long)]
        replace: bool,
    },
    /// Show the top players of one type
    Query {
        /// Player type, e.g. "Scorer"
        player_type: String,
        /// Column to sort by, descending
        #[arg(long, default_value = "ppm")]
        sort_col: String,
        /// Maximum rows (default: [web].max_rows)
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("hoopstype starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: season {}", config.acquire.season);

    match cli.command {
        Commands::CreateDb { db_path } => {
            let path = db_path.unwrap_or_else(|| config.db_path.clone());
            Database::open(&path).context("failed to create database")?;
            info!("Database and results table created at {}", path);
            println!("Results table ready at {path}");
        }
        Commands::GetClusters { loadpath, savepath } => {
            let load = loadpath.unwrap_or_else(|| PathBuf::from(&config.data.raw_path));
            let save = savepath.unwrap_or_else(|| PathBuf::from(&config.data.clean_path));
            let run = pipeline::get_clusters(&config, &load, &save)?;

            println!("{} eligible players clustered", run.eligible_players);
            for point in &run.sweep.points {
                println!(
                    "  k={:<2} sse={:>10.3} silhouette={:.3}",
                    point.k, point.sse, point.silhouette
                );
            }
            println!(
                "Stability: {}% of players kept their cluster",
                run.stability.percent_agreement
            );
            println!("Labeled data saved to {}", save.display());
        }
        Commands::PopulateDb {
            db_path,
            loadpath,
            replace,
        } => {
            let path = db_path.unwrap_or_else(|| config.db_path.clone());
            let load = loadpath.unwrap_or_else(|| PathBuf::from(&config.data.clean_path));
            let db = Database::open(&path).context("failed to open database")?;
            let count = persist::populate(&db, &load, &PersistColumns::from_config(&config), replace)?;
            println!("{count} players written to {path}");
        }
        Commands::Query {
            player_type,
            sort_col,
            limit,
        } => {
            let db = Database::open(&config.db_path).context("failed to open database")?;
            let limit = limit.unwrap_or(config.max_rows);
            let players = db.players_by_type(&player_type, &sort_col, limit)?;
            if players.is_empty() {
                let known = db.player_types()?;
                println!("No players of type `{player_type}`. Known types: {}", known.join(", "));
            }
            for p in players {
                println!(
                    "{:<28} {:<10} {:<22} ppm {:>5.2}  apm {:>5.2}  rpm {:>5.2}",
                    p.player_name, p.year, p.team, p.ppm, p.apm, p.rpm
                );
            }
        }
    }

    Ok(())
}

/// Initialize tracing to log to a file so stdout stays for command output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("hoopstype.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopstype=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
