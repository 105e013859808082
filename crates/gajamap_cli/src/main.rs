//! Gaja-Map command-line front end.
//!
//! # Responsibility
//! - Drive the core trip store against a local state database.
//! - Keep the probe output (`gajamap ping`) deterministic for quick sanity
//!   checks of core linkage.

use clap::{Parser, Subcommand};
use gajamap_core::db::{open_db, DbError};
use gajamap_core::{
    core_version, default_log_level, init_logging, ping, DayFilter, ItemDraft, LoggingError,
    SqliteStateRepository, StoreError, TripStore,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;

/// Gaja-Map - plan pilgrimage trips as day-tagged lists of map links
#[derive(Parser)]
#[command(name = "gajamap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the state database
    #[arg(long, global = true, env = "GAJAMAP_DB_PATH", default_value = "gajamap.sqlite3")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error); defaults to debug in debug
    /// builds and info in release builds
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging stays off without it
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print core linkage info
    Ping,

    /// Show the current trip's places
    List {
        /// Day tab to show ("all" or a day value)
        #[arg(long, default_value = "all")]
        day: String,

        /// Case-insensitive text matched against name and memo
        #[arg(long, default_value = "")]
        search: String,
    },

    /// Add a place to the current trip
    Add {
        /// Place name
        name: String,

        /// Map url or shared text containing it
        url: String,

        /// Day tag
        #[arg(long, default_value = "1")]
        day: String,

        /// Free-form memo
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Flip a place's visited state
    Toggle {
        /// Item id
        id: i64,
    },

    /// Rename the current trip or change its length
    Trip {
        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New day count
        #[arg(long)]
        days: Option<u32>,
    },

    /// Archive the current trip and start a new one
    Archive,

    /// List archived trips and trips other than the current one
    History,

    /// Make a trip from history current
    Open {
        /// Trip id
        id: i64,
    },

    /// Write a dated backup file of every trip
    Export {
        /// Directory to write into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Replace every trip with the contents of a backup file
    Import {
        /// Backup file path
        file: PathBuf,
    },
}

#[derive(Debug)]
enum CliError {
    Logging(LoggingError),
    Db(DbError),
    Store(StoreError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "logging: {err}"),
            Self::Db(err) => write!(f, "database: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().as_str().to_string());
        init_logging(&level, log_dir)?;
    }

    let command = match cli.command {
        None | Some(Commands::Ping) => {
            print_probe();
            return Ok(());
        }
        Some(command) => command,
    };

    let conn = open_db(&cli.db)?;
    let repo = SqliteStateRepository::try_new(&conn).map_err(StoreError::from)?;
    let mut store = TripStore::load_or_migrate(repo)?;

    match command {
        Commands::Ping => print_probe(),
        Commands::List { day, search } => {
            let Some(trip) = store.current() else {
                println!("no current trip");
                return Ok(());
            };
            println!("{} ({} days) id={}", trip.title, trip.days, trip.id);
            for item in store.query_current(&DayFilter::parse(&day), &search) {
                let mark = if item.visited { "x" } else { " " };
                println!("[{mark}] {} day={} {} {}", item.id, item.day, item.name, item.url);
                if !item.memo.is_empty() {
                    println!("      {}", item.memo.replace('\n', " / "));
                }
            }
        }
        Commands::Add {
            name,
            url,
            day,
            memo,
        } => match store.items().add(ItemDraft::new(name, url, day, memo))? {
            Some(item) => println!("added {}", item.id),
            None => println!("no current trip"),
        },
        Commands::Toggle { id } => match store.items().toggle_visited(id)? {
            Some(outcome) if outcome.became_visited => println!("{id} visited. 가자!"),
            Some(_) => println!("{id} not visited"),
            None => println!("no item {id}"),
        },
        Commands::Trip { title, days } => {
            if let Some(title) = title {
                store.rename_current(&title)?;
            }
            if let Some(days) = days {
                store.set_current_days(days)?;
            }
            if let Some(trip) = store.current() {
                println!("{} ({} days)", trip.title, trip.days);
            }
        }
        Commands::Archive => match store.archive().archive_current_and_start_new()? {
            Some(trip_id) => println!("archived; new trip {trip_id}"),
            None => println!("no current trip"),
        },
        Commands::History => {
            for summary in store.archive().historical_summaries() {
                println!(
                    "{} {} {} {}/{} visited{}",
                    summary.id,
                    summary.created_at.format("%Y-%m-%d"),
                    summary.title,
                    summary.visited_count,
                    summary.item_count,
                    if summary.archived { " (archived)" } else { "" }
                );
            }
        }
        Commands::Open { id } => {
            if store.archive().open_from_history(id)? {
                println!("opened {id}");
            } else {
                println!("no trip {id}");
            }
        }
        Commands::Export { out } => {
            let path = store.export_to_dir(&out)?;
            println!("wrote {}", path.display());
        }
        Commands::Import { file } => {
            let report = store.import_from_path(&file)?;
            println!(
                "restored {} trip(s), {} place(s)",
                report.trip_count, report.item_count
            );
        }
    }
    Ok(())
}

fn print_probe() {
    println!("gajamap_core ping={}", ping());
    println!("gajamap_core version={}", core_version());
}
