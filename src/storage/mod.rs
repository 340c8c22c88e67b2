//! Storage module for persisting harvested records
//!
//! This module handles all record store backends, including:
//! - Append-only CSV files (one per topic)
//! - SQLite databases (one per topic)
//! - An in-memory store for embedding and tests

mod csv_store;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use csv_store::CsvStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{RecordStore, StorageError, StorageResult};

use crate::config::OutputFormat;
use std::path::{Path, PathBuf};

/// Builds the destination path for a topic
///
/// Spaces in the topic become hyphens: `"software engineer"` with the CSV
/// format maps to `<directory>/software-engineer.csv`.
pub fn destination_for(directory: &Path, topic: &str, format: OutputFormat) -> PathBuf {
    let stem = topic.trim().replace(' ', "-");
    directory.join(format!("{}.{}", stem, format.extension()))
}

/// Opens the record store for a destination
///
/// # Arguments
///
/// * `path` - Destination path, usually from [`destination_for`]
/// * `format` - Which backend to use
///
/// # Returns
///
/// * `Ok(Box<dyn RecordStore>)` - Store ready for appends
/// * `Err(StorageError)` - Failed to open the backend
pub fn open_store(path: &Path, format: OutputFormat) -> StorageResult<Box<dyn RecordStore>> {
    match format {
        OutputFormat::Csv => Ok(Box::new(CsvStore::new(path))),
        OutputFormat::Sqlite => Ok(Box::new(SqliteStore::new(path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_destination_for_csv() {
        let path = destination_for(Path::new("out"), "software engineer", OutputFormat::Csv);
        assert_eq!(path, Path::new("out").join("software-engineer.csv"));
    }

    #[test]
    fn test_destination_for_sqlite() {
        let path = destination_for(Path::new("."), " data analyst ", OutputFormat::Sqlite);
        assert_eq!(path, Path::new(".").join("data-analyst.sqlite"));
    }

    #[test]
    fn test_open_store_reports_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobs.sqlite");
        let store = open_store(&path, OutputFormat::Sqlite).unwrap();
        assert_eq!(store.destination(), path.display().to_string());
        assert!(!store.exists().unwrap());
    }
}
