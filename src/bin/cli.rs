//! hackwatch CLI
//!
//! Sweeps configured Geekhack boards and keeps their snapshot tables
//! up to date.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hackwatch::{
    error::Result,
    models::{Board, Config},
    pipeline,
    storage::BoardStore,
};

/// hackwatch - Geekhack board watcher
#[derive(Parser, Debug)]
#[command(name = "hackwatch", version, about = "Incremental Geekhack board snapshots")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep all configured boards (or one, with --board)
    Watch {
        /// Only sweep the board with this name
        #[arg(long)]
        board: Option<String>,
    },

    /// Validate the configuration file
    Validate,

    /// Show baseline row counts per board
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load_or_default(&cli.config);
    config.validate()?;

    match cli.command {
        Command::Watch { board } => {
            let boards: Vec<Board> = match &board {
                Some(name) => {
                    let selected: Vec<Board> = config
                        .boards
                        .iter()
                        .filter(|b| b.name.eq_ignore_ascii_case(name))
                        .cloned()
                        .collect();
                    if selected.is_empty() {
                        log::error!("No configured board named '{name}'");
                        return Ok(ExitCode::FAILURE);
                    }
                    selected
                }
                None => config.boards.clone(),
            };

            log::info!("Watching {} board(s)...", boards.len());
            let outcome = pipeline::run_watch(&config, &boards).await?;

            for report in &outcome.reports {
                log::info!(
                    "{}: {} new, {} updated, ended by {}",
                    report.board,
                    report.new_posts,
                    report.updated_posts,
                    report.end
                );
            }

            if outcome.failed_boards > 0 {
                log::error!("{} board(s) failed", outcome.failed_boards);
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Validate => {
            log::info!("Configuration OK: {} board(s) defined", config.boards.len());
        }

        Command::Info => {
            log::info!("Database: {}", config.watcher.database_path);
            for board in &config.boards {
                let store = BoardStore::open(&config.watcher.database_path, &board.table)?;
                log::info!(
                    "{} ({}): {} post(s) in baseline",
                    board.name,
                    board.table,
                    store.len()
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
