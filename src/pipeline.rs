//! Deduplicating, batching record pipeline
//!
//! One pipeline serves one topic. Workers call [`SinkPipeline::add`]
//! concurrently; the pipeline drops records whose key it has already seen,
//! queues the rest, and appends them to its record store whenever the queue
//! reaches the batch limit.
//!
//! # Locking
//!
//! Two locks, always taken in the order store -> state:
//!
//! - `state` guards the seen-key set and the pending batch. Every `add` runs
//!   its lookup, insert and append under it.
//! - `store` guards the record store. Holding it means a flush is in
//!   progress. `add` only ever `try_lock`s it, so a busy store lets records
//!   keep accumulating instead of starting a second, overlapping flush.
//!
//! A flush holds the store lock for the whole write but the state lock only
//! long enough to detach the pending batch, so workers keep adding while the
//! detached batch is written.

use crate::record::Record;
use crate::storage::{RecordStore, StorageError, StorageResult};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use tracing::{debug, error, info, warn};

/// Default number of pending records that triggers a flush
pub const DEFAULT_BATCH_LIMIT: usize = 50;

/// What happened to a record handed to [`SinkPipeline::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Queued for a later flush
    Accepted,
    /// Key already seen; the record was dropped
    Duplicate,
    /// Queued, and this call flushed `rows` records to the store
    Flushed { rows: usize },
}

/// Counters describing a pipeline's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub accepted: usize,
    pub duplicates: usize,
    pub rows_written: usize,
    pub batches_written: usize,
    pub pending: usize,
}

#[derive(Debug, Default)]
struct PendingState {
    seen: HashSet<String>,
    pending: Vec<Record>,
    accepted: usize,
    duplicates: usize,
}

struct StoreSlot<S> {
    store: S,
    rows_written: usize,
    batches_written: usize,
}

/// Deduplicating batch writer in front of a [`RecordStore`]
pub struct SinkPipeline<S: RecordStore> {
    batch_limit: usize,
    destination: String,
    state: Mutex<PendingState>,
    store: Mutex<StoreSlot<S>>,
}

impl<S: RecordStore> SinkPipeline<S> {
    /// Creates a pipeline with the default batch limit
    pub fn new(store: S) -> Self {
        Self::with_batch_limit(store, DEFAULT_BATCH_LIMIT)
    }

    /// Creates a pipeline flushing every `batch_limit` records
    ///
    /// A limit of zero is treated as one.
    pub fn with_batch_limit(store: S, batch_limit: usize) -> Self {
        let destination = store.destination();
        Self {
            batch_limit: batch_limit.max(1),
            destination,
            state: Mutex::new(PendingState::default()),
            store: Mutex::new(StoreSlot {
                store,
                rows_written: 0,
                batches_written: 0,
            }),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    /// Adds a record, flushing if the batch limit is reached
    ///
    /// Duplicates are dropped and reported as [`AddOutcome::Duplicate`]; that
    /// is a notice, not an error. If the store is busy with another flush the
    /// record stays queued and a later `add` or `close` writes it.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the triggered flush fails. The batch is
    /// re-queued in that case, so nothing is lost.
    pub fn add(&self, record: Record) -> StorageResult<AddOutcome> {
        let (batch_full, duplicate_key) = {
            let mut state = self.lock_state();
            if state.seen.contains(record.primary_key()) {
                state.duplicates += 1;
                (false, Some(record.primary_key().to_string()))
            } else {
                state.seen.insert(record.primary_key().to_string());
                state.accepted += 1;
                state.pending.push(record);
                (state.pending.len() >= self.batch_limit, None)
            }
        };

        if let Some(key) = duplicate_key {
            warn!(key = %key, destination = %self.destination, "Duplicate item found, dropped");
            return Ok(AddOutcome::Duplicate);
        }

        if !batch_full {
            return Ok(AddOutcome::Accepted);
        }

        let slot = match self.store.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::WouldBlock) => {
                debug!(destination = %self.destination, "Flush in progress, deferring");
                return Ok(AddOutcome::Accepted);
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        match self.flush_locked(slot)? {
            0 => Ok(AddOutcome::Accepted),
            rows => Ok(AddOutcome::Flushed { rows }),
        }
    }

    /// Writes the pending batch to the store
    ///
    /// Waits for an in-progress flush to finish first. Returns the number of
    /// rows written (zero when nothing was pending).
    pub fn flush(&self) -> StorageResult<usize> {
        let slot = self.lock_store();
        self.flush_locked(slot)
    }

    /// Drains the pipeline
    ///
    /// Blocks until any in-progress flush completes, then writes whatever is
    /// still pending. On success no records remain queued.
    pub fn close(&self) -> StorageResult<PipelineStats> {
        let slot = self.lock_store();
        self.flush_locked(slot)?;

        let stats = self.stats();
        info!(
            destination = %self.destination,
            rows_written = stats.rows_written,
            duplicates = stats.duplicates,
            "Pipeline closed"
        );
        Ok(stats)
    }

    /// Number of records waiting for a flush
    pub fn pending_len(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Snapshot of the pipeline counters
    pub fn stats(&self) -> PipelineStats {
        let (rows_written, batches_written) = {
            let slot = self.lock_store();
            (slot.rows_written, slot.batches_written)
        };
        let state = self.lock_state();
        PipelineStats {
            accepted: state.accepted,
            duplicates: state.duplicates,
            rows_written,
            batches_written,
            pending: state.pending.len(),
        }
    }

    fn flush_locked(&self, mut slot: MutexGuard<'_, StoreSlot<S>>) -> StorageResult<usize> {
        let batch = std::mem::take(&mut self.lock_state().pending);
        if batch.is_empty() {
            return Ok(0);
        }

        match write_batch(&mut slot.store, &batch) {
            Ok(()) => {
                slot.rows_written += batch.len();
                slot.batches_written += 1;
                debug!(
                    destination = %self.destination,
                    rows = batch.len(),
                    "Flushed batch"
                );
                Ok(batch.len())
            }
            Err(e) => {
                let rows = batch.len();
                self.requeue(batch);
                error!(
                    destination = %self.destination,
                    rows,
                    error = %e,
                    "Flush failed, batch re-queued"
                );
                Err(e)
            }
        }
    }

    /// Puts a failed batch back in front of anything added since
    fn requeue(&self, mut batch: Vec<Record>) {
        let mut state = self.lock_state();
        batch.append(&mut state.pending);
        state.pending = batch;
    }

    fn lock_state(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_store(&self) -> MutexGuard<'_, StoreSlot<S>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write_batch<S: RecordStore>(store: &mut S, batch: &[Record]) -> Result<(), StorageError> {
    let is_new = !store.exists()?;
    store.append(batch, is_new)
}
