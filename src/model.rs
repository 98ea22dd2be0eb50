use std::{env::VarError, io};

use rusqlite::{ErrorCode, types::Value};
use thiserror::Error;

use crate::store::schema::TableSpec;

/// One normalized row, in the column order of its `TableSpec`. The symbol is not part of it.
pub type Row = Vec<Value>;

/// All rows extracted from one document for a single table.
#[derive(Debug)]
pub struct TableRows {
    pub table: &'static TableSpec,
    pub rows: Vec<Row>,
}

/// The ten normalized record sets of one equity snapshot, in write order.
#[derive(Debug)]
pub struct EquityRecords {
    pub symbol: String,
    pub tables: Vec<TableRows>,
}

#[cfg(test)]
impl EquityRecords {
    pub fn rows(&self, table_name: &str) -> &[Row] {
        self.tables
            .iter()
            .find(|t| t.table.name == table_name)
            .map(|t| t.rows.as_slice())
            .unwrap_or(&[])
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("source directory '{0}' does not exist")]
    DirectoryNotFound(String),
    #[error("schema initialization failed: {0}")]
    SchemaInitialization(rusqlite::Error),
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(rusqlite::Error),
    #[error("database connection lost: {0}")]
    ConnectionLost(rusqlite::Error),
    #[error("database error: {0}")]
    Database(rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not write report: {0}")]
    Report(#[from] csv::Error),
    #[error("environment variable not set: {0}")]
    EnvVarNotSet(#[from] VarError),
}

impl LoaderError {
    /// Fatal errors abort the run; everything else is contained to the file being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoaderError::DirectoryNotFound(_)
                | LoaderError::SchemaInitialization(_)
                | LoaderError::ConnectionLost(_)
                | LoaderError::EnvVarNotSet(_)
        )
    }
}

impl From<rusqlite::Error> for LoaderError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation(value),
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::DiskFull
                | ErrorCode::ReadOnly,
            ) => Self::ConnectionLost(value),
            _ => Self::Database(value),
        }
    }
}
