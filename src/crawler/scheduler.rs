//! Worker pool that spreads one topic's pages over a fixed number of tasks
//!
//! This module handles:
//! - Handing out page indices to workers from a shared counter
//! - Running each page fetch (with retries) in its own task
//! - Routing extracted records into the topic's pipeline
//! - Collecting successes and failures into a report

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{fetch_with_retry, PageFetcher, PageQuery};
use crate::pipeline::{AddOutcome, SinkPipeline};
use crate::storage::RecordStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A page that could not be harvested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    /// Zero-based page number
    pub page_index: usize,

    /// Why the page failed (last fetch error, or a task panic)
    pub message: String,
}

/// Outcome of one scheduler run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Number of pages the run was asked to fetch
    pub pages_requested: usize,

    /// Pages that produced records (or an empty result) successfully
    pub pages_succeeded: Vec<usize>,

    /// Pages that failed after all retries, ordered by index
    pub failures: Vec<PageFailure>,

    /// Records returned by successful fetches, duplicates included
    pub records_received: usize,

    /// Records the pipeline kept
    pub records_accepted: usize,

    /// Records the pipeline dropped as duplicates
    pub duplicates: usize,

    /// Flush errors hit while adding; the affected batches stay queued
    pub storage_errors: Vec<String>,

    /// Workers that died outside of a page fetch
    pub worker_errors: Vec<String>,
}

impl CrawlReport {
    /// True if every page succeeded and no worker died
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.worker_errors.is_empty()
    }

    /// Indices of the failed pages
    pub fn failed_pages(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.page_index).collect()
    }

    fn merge(&mut self, other: CrawlReport) {
        self.pages_succeeded.extend(other.pages_succeeded);
        self.failures.extend(other.failures);
        self.records_received += other.records_received;
        self.records_accepted += other.records_accepted;
        self.duplicates += other.duplicates;
        self.storage_errors.extend(other.storage_errors);
        self.worker_errors.extend(other.worker_errors);
    }
}

/// Scheduler fans a page range out over a fixed worker pool
///
/// Workers pull the next unclaimed page index until the range is exhausted.
/// Pages complete in no particular order. A page that fails terminally is
/// recorded in the report; sibling workers keep going.
#[derive(Debug, Clone)]
pub struct Scheduler {
    worker_count: usize,
    max_retries: u32,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `worker_count` - Number of concurrent workers (at least one is used)
    /// * `max_retries` - Retry budget per page
    pub fn new(worker_count: usize, max_retries: u32) -> Self {
        Self {
            worker_count: worker_count.max(1),
            max_retries,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.workers, config.max_retries)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Fetches pages `[0, page_count)` of `template` into `pipeline`
    ///
    /// Returns once every page has either succeeded or failed. The pipeline
    /// is left open; closing it is the caller's job.
    pub async fn run<F, S>(
        &self,
        fetcher: Arc<F>,
        pipeline: Arc<SinkPipeline<S>>,
        template: &PageQuery,
        page_count: usize,
    ) -> CrawlReport
    where
        F: PageFetcher + ?Sized + 'static,
        S: RecordStore + 'static,
    {
        let mut report = CrawlReport {
            pages_requested: page_count,
            ..CrawlReport::default()
        };

        if page_count == 0 {
            return report;
        }

        let workers = self.worker_count.min(page_count);
        let next_page = Arc::new(AtomicUsize::new(0));

        info!(
            topic = %template.topic,
            pages = page_count,
            workers,
            "Starting scheduler"
        );

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                fetcher: Arc::clone(&fetcher),
                pipeline: Arc::clone(&pipeline),
                next_page: Arc::clone(&next_page),
                template: template.clone(),
                page_count,
                max_retries: self.max_retries,
            };
            handles.push(tokio::spawn(worker.run()));
        }

        for handle in handles {
            match handle.await {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    error!(error = %e, "Worker task failed");
                    report.worker_errors.push(e.to_string());
                }
            }
        }

        report.pages_succeeded.sort_unstable();
        report.failures.sort_by_key(|f| f.page_index);

        info!(
            topic = %template.topic,
            succeeded = report.pages_succeeded.len(),
            failed = report.failures.len(),
            accepted = report.records_accepted,
            duplicates = report.duplicates,
            "Scheduler finished"
        );

        report
    }
}

struct Worker<F: ?Sized, S: RecordStore> {
    id: usize,
    fetcher: Arc<F>,
    pipeline: Arc<SinkPipeline<S>>,
    next_page: Arc<AtomicUsize>,
    template: PageQuery,
    page_count: usize,
    max_retries: u32,
}

impl<F, S> Worker<F, S>
where
    F: PageFetcher + ?Sized + 'static,
    S: RecordStore + 'static,
{
    async fn run(self) -> CrawlReport {
        let mut report = CrawlReport::default();

        loop {
            let page_index = self.next_page.fetch_add(1, Ordering::SeqCst);
            if page_index >= self.page_count {
                break;
            }

            debug!(worker = self.id, page_index, "Claimed page");
            let query = self.template.for_page(page_index);

            // The fetch runs in its own task so a panic is confined to this page
            let fetcher = Arc::clone(&self.fetcher);
            let max_retries = self.max_retries;
            let fetched = tokio::spawn(async move {
                fetch_with_retry(fetcher.as_ref(), &query, max_retries).await
            })
            .await;

            let records = match fetched {
                Ok(Ok(records)) => records,
                Ok(Err(e)) => {
                    report.failures.push(PageFailure {
                        page_index,
                        message: e.to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    error!(worker = self.id, page_index, error = %e, "Page task failed");
                    report.failures.push(PageFailure {
                        page_index,
                        message: format!("page task failed: {}", e),
                    });
                    continue;
                }
            };

            report.pages_succeeded.push(page_index);
            report.records_received += records.len();

            for record in records {
                match self.pipeline.add(record) {
                    Ok(AddOutcome::Duplicate) => report.duplicates += 1,
                    Ok(_) => report.records_accepted += 1,
                    Err(e) => {
                        // The record itself was accepted; only its batch write failed
                        report.records_accepted += 1;
                        warn!(worker = self.id, page_index, error = %e, "Flush failed while adding");
                        report.storage_errors.push(e.to_string());
                    }
                }
            }
        }

        report
    }
}
