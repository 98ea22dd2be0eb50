use std::{env::VarError, path::PathBuf};

use crate::model;

/// Environment variable holding the SQLite database file.
pub const SQLITE_FILE_VAR: &str = "sqlite_file";
/// Environment variable holding the directory of scraped equity documents.
pub const SOURCE_DIR_VAR: &str = "equity_source_dir";
/// Where the scraper writes its documents by default.
pub const DEFAULT_SOURCE_DIR: &str = "selected_stocks";

#[derive(Debug, PartialEq)]
pub struct LoaderConfig {
    pub sqlite_file: String,
    pub source_directory: PathBuf,
}

impl LoaderConfig {
    /// Command-line values win; the environment (and `.env`) fills in the rest.
    pub fn resolve(db: Option<String>, source_dir: Option<PathBuf>) -> model::Result<Self> {
        Self::resolve_with(db, source_dir, |key| std::env::var(key))
    }

    fn resolve_with(
        db: Option<String>,
        source_dir: Option<PathBuf>,
        env: impl Fn(&str) -> Result<String, VarError>,
    ) -> model::Result<Self> {
        let sqlite_file = match db {
            Some(db) => db,
            None => env(SQLITE_FILE_VAR)?,
        };
        let source_directory = source_dir
            .or_else(|| env(SOURCE_DIR_VAR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));
        Ok(Self {
            sqlite_file,
            source_directory,
        })
    }
}
