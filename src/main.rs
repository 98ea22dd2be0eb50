// Bulk loader for scraped equity snapshots.
// Configuration resolution.
mod config;
// Reading JSON documents from the source directory.
mod documents;
// Document to record-set decomposition.
mod extract;
// Per-file load loop.
mod ingest;
// Error type and normalized records.
mod model;
// Per-field coercion rules.
mod normalize;
// CSV run report.
mod report;
// Data storage module.
mod store {
    /// Per-file transactional writes.
    pub mod equity;
    /// Table definitions and creation.
    pub mod schema;
    /// SQLite connection handling.
    pub mod sqlite;
}
#[cfg(test)]
mod fixtures;

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use dotenv::dotenv;

use crate::config::LoaderConfig;

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// SQLite database file; falls back to the `sqlite_file` environment variable.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

// Subcommands for the application.
#[derive(Subcommand, Debug)]
enum Commands {
    // Load every JSON document of a directory.
    Load {
        source_dir: Option<PathBuf>,
        /// Write a per-file CSV report of the run.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    // Create the tables without loading anything.
    InitSchema,
}

fn main() -> ExitCode {
    dotenv().ok();

    env_logger::init();

    let args = Args::parse();

    let source_dir = match &args.command {
        Commands::Load { source_dir, .. } => source_dir.clone(),
        Commands::InitSchema => None,
    };
    let config = match LoaderConfig::resolve(args.db, source_dir) {
        Ok(config) => config,
        Err(err) => {
            log::error!("Error resolving configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut conn = match store::sqlite::init_sqlite_connection(&config.sqlite_file) {
        Ok(conn) => conn,
        Err(err) => {
            log::error!("Error initializing database connection: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let status = match args.command {
        Commands::Load { report: report_path, .. } => {
            match ingest::load_directory(&config.source_directory, &mut conn) {
                Ok(summary) => {
                    log::info!(
                        "Processed {} files: {} loaded ({} rows), {} failed",
                        summary.processed(),
                        summary.loaded.len(),
                        summary.rows_written(),
                        summary.failures.len()
                    );
                    match report_path.map(|path| report::write_report_file(&summary, &path)) {
                        Some(Err(err)) => {
                            log::error!("Error writing report: {}", err);
                            ExitCode::FAILURE
                        }
                        _ => ExitCode::SUCCESS,
                    }
                }
                Err(err) => {
                    log::error!("Error loading {}: {}", config.source_directory.display(), err);
                    ExitCode::FAILURE
                }
            }
        }

        Commands::InitSchema => match store::schema::create_tables(&mut conn) {
            Ok(_) => {
                log::info!("Successfully created tables");
                ExitCode::SUCCESS
            }
            Err(err) => {
                log::error!("Error creating tables: {}", err);
                ExitCode::FAILURE
            }
        },
    };

    if let Err(err) = store::sqlite::close_connection(conn) {
        log::error!("Error closing database connection: {}", err);
        return ExitCode::FAILURE;
    }
    status
}
