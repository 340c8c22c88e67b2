//! CSV record store
//!
//! One file per topic, one row per record, columns in `FIELD_NAMES` order.
//! The file is always opened in append mode.

use crate::record::{Record, FIELD_NAMES};
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only CSV file store
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// Creates a store writing to `path`
    ///
    /// Nothing is touched on disk until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for CsvStore {
    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> StorageResult<bool> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn append(&mut self, rows: &[Record], write_header_if_new: bool) -> StorageResult<()> {
        let bytes = encode_rows(rows, write_header_if_new)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // The whole batch goes out in a single write
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(())
    }
}

/// Serializes a batch (and optionally the header) into CSV bytes
fn encode_rows(rows: &[Record], with_header: bool) -> StorageResult<Vec<u8>> {
    // Header handling is explicit so appends never repeat it
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    if with_header {
        writer.write_record(FIELD_NAMES)?;
    }

    for record in rows {
        writer.write_record(record.as_row())?;
    }

    writer
        .into_inner()
        .map_err(|e| StorageError::from(e.into_error()))
}
