//! Storage traits and error types
//!
//! This module defines the trait interface for record store backends and
//! associated error types.

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Write failed for {destination}: {message}")]
    Write {
        destination: String,
        message: String,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for append-only record store implementations
///
/// A store is bound to one destination (one topic). Rows are only ever
/// appended; a store never truncates what is already there. Callers are
/// expected to serialize access (the pipeline holds the store behind a lock).
pub trait RecordStore: Send {
    /// Human-readable name of the destination (file path, table, ...)
    fn destination(&self) -> String;

    /// Returns true if the destination already holds data
    ///
    /// A destination that exists but is empty counts as not existing, so the
    /// next append writes the header.
    fn exists(&self) -> StorageResult<bool>;

    /// Appends rows in the given order
    ///
    /// # Arguments
    ///
    /// * `rows` - Records to append, written in slice order
    /// * `write_header_if_new` - Write the structural header (field names)
    ///   before the rows. Callers pass `!self.exists()?` so the header is
    ///   written once, on first creation of the destination.
    fn append(&mut self, rows: &[Record], write_header_if_new: bool) -> StorageResult<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn destination(&self) -> String {
        (**self).destination()
    }

    fn exists(&self) -> StorageResult<bool> {
        (**self).exists()
    }

    fn append(&mut self, rows: &[Record], write_header_if_new: bool) -> StorageResult<()> {
        (**self).append(rows, write_header_if_new)
    }
}
