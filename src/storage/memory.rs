//! In-process record store
//!
//! Keeps rows in memory behind a shared handle. Cloning a `MemoryStore`
//! yields another view of the same rows, so a caller can hand one clone to a
//! pipeline and inspect what was written through the other.

use crate::record::Record;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<Record>,
    header_writes: usize,
    appends: Vec<usize>,
    failures_remaining: usize,
}

/// Shared in-memory record store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::default(),
        }
    }

    /// Makes the next `count` appends fail with a write error
    pub fn fail_next_appends(&self, count: usize) {
        self.lock().failures_remaining = count;
    }

    /// All rows written so far, in write order
    pub fn rows(&self) -> Vec<Record> {
        self.lock().rows.clone()
    }

    /// How many times the header was written
    pub fn header_writes(&self) -> usize {
        self.lock().header_writes
    }

    /// Size of each successful append, in order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().appends.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryStore {
    fn destination(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn exists(&self) -> StorageResult<bool> {
        let state = self.lock();
        Ok(state.header_writes > 0 || !state.rows.is_empty())
    }

    fn append(&mut self, rows: &[Record], write_header_if_new: bool) -> StorageResult<()> {
        let destination = self.destination();
        let mut state = self.lock();

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(StorageError::Write {
                destination,
                message: "injected write failure".to_string(),
            });
        }

        if write_header_if_new {
            state.header_writes += 1;
        }
        state.rows.extend_from_slice(rows);
        state.appends.push(rows.len());
        Ok(())
    }
}
