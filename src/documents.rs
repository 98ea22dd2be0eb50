use std::{
    fs::{self, OpenOptions, ReadDir},
    io::BufReader,
    path::Path,
};

use serde_json::Value;

use crate::model::{self, LoaderError};

const DOCUMENT_EXTENSION: &str = ".json";

/// Lazily yields `(filename, parsed document)` for every `.json` entry of a directory,
/// in whatever order the filesystem enumerates them.
pub struct Documents {
    entries: ReadDir,
}

/// Opens the source directory. Fails up front, before any file is read, if it does not exist.
pub fn read_documents_from_dir(source_directory: &Path) -> model::Result<Documents> {
    if !source_directory.is_dir() {
        return Err(LoaderError::DirectoryNotFound(
            source_directory.display().to_string(),
        ));
    }
    let entries = fs::read_dir(source_directory)?;
    Ok(Documents { entries })
}

/// Reads and parses one document. Unreadable or invalid JSON is an error for this file only.
pub fn read_document(path: &Path) -> model::Result<Value> {
    let file = OpenOptions::new().read(true).open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| LoaderError::MalformedDocument(format!("invalid JSON: {}", e)))
}

impl Iterator for Documents {
    type Item = (String, model::Result<Value>);

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Skipping unreadable directory entry: {}", err);
                    continue;
                }
            };
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.ends_with(DOCUMENT_EXTENSION) {
                continue;
            }
            let document = read_document(&entry.path());
            return Some((filename, document));
        }
        None
    }
}
