use std::path::Path;

use rusqlite::Connection;
use serde_json::Value;

use crate::{
    documents, extract,
    model::{self, LoaderError},
    store::{
        equity::{self, WriteOutcome},
        schema,
    },
};

#[derive(Debug)]
pub struct LoadedFile {
    pub filename: String,
    pub symbol: String,
    pub rows_written: usize,
}

#[derive(Debug)]
pub struct FileFailure {
    pub filename: String,
    pub symbol: Option<String>,
    pub error: LoaderError,
}

/// What one run did, file by file.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub loaded: Vec<LoadedFile>,
    pub failures: Vec<FileFailure>,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.loaded.len() + self.failures.len()
    }

    pub fn rows_written(&self) -> usize {
        self.loaded.iter().map(|f| f.rows_written).sum()
    }
}

/// Loads every JSON document of `source_directory` into the database, one transaction per file.
///
/// File-level failures are logged and recorded in the summary; only a missing directory,
/// a schema failure or a lost connection end the run early.
pub fn load_directory(source_directory: &Path, conn: &mut Connection) -> model::Result<RunSummary> {
    let documents = documents::read_documents_from_dir(source_directory)?;

    schema::create_tables(conn).map_err(LoaderError::SchemaInitialization)?;

    let mut summary = RunSummary::default();
    for (filename, document) in documents {
        match load_document(conn, document) {
            Ok((symbol, outcome)) => {
                log::info!(
                    "Successfully loaded {} from {} ({} rows)",
                    symbol,
                    filename,
                    outcome.total()
                );
                summary.loaded.push(LoadedFile {
                    filename,
                    symbol,
                    rows_written: outcome.total(),
                });
            }
            Err((symbol, error)) if error.is_fatal() => {
                log::error!(
                    "Aborting run at file {} (symbol {}): {}",
                    filename,
                    symbol.as_deref().unwrap_or("unknown"),
                    error
                );
                return Err(error);
            }
            Err((symbol, error)) => {
                log::error!(
                    "Error processing file {} (symbol {}): {}",
                    filename,
                    symbol.as_deref().unwrap_or("unknown"),
                    error
                );
                summary.failures.push(FileFailure {
                    filename,
                    symbol,
                    error,
                });
            }
        }
    }

    Ok(summary)
}

/// Extracts and writes one document. The error carries the symbol once it is known.
fn load_document(
    conn: &mut Connection,
    document: model::Result<Value>,
) -> Result<(String, WriteOutcome), (Option<String>, LoaderError)> {
    let records = document
        .and_then(|d| extract::extract_equity_records(&d))
        .map_err(|err| (None, err))?;
    match equity::save_equity_records(conn, &records) {
        Ok(outcome) => Ok((records.symbol, outcome)),
        Err(err) => Err((Some(records.symbol), err)),
    }
}
