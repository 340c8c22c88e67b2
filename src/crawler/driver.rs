//! Crawl driver - runs every configured topic in turn
//!
//! For each topic the driver:
//! - Opens the record store for the topic's destination
//! - Builds a fresh pipeline (fresh seen-key set)
//! - Runs the scheduler over the configured page range
//! - Closes the pipeline, which flushes everything still queued
//!
//! Topics never overlap: the next one starts only after the previous
//! pipeline has closed.

use crate::config::{validate, Config};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher, PageQuery};
use crate::crawler::scheduler::Scheduler;
use crate::output::{HarvestSummary, TopicReport};
use crate::pipeline::{PipelineStats, SinkPipeline};
use crate::storage::{destination_for, open_store, RecordStore, StorageError, StorageResult};
use crate::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Attempts made to drain a pipeline before the topic is abandoned
const CLOSE_ATTEMPTS: u32 = 2;

/// Main harvest driver
pub struct Driver<F: PageFetcher + ?Sized> {
    config: Arc<Config>,
    fetcher: Arc<F>,
    scheduler: Scheduler,
}

impl Driver<HttpFetcher> {
    /// Creates a driver that fetches over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The validated harvest configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Driver)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration, or the HTTP client could
    ///   not be built
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        let fetcher = HttpFetcher::from_config(&config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }
}

impl<F: PageFetcher + ?Sized + 'static> Driver<F> {
    /// Creates a driver around any page fetcher
    pub fn with_fetcher(config: Config, fetcher: Arc<F>) -> Self {
        let scheduler = Scheduler::from_config(&config.crawler);

        if config.credentials.is_some() {
            info!("API credentials loaded; requests are sent without them");
        }

        Self {
            config: Arc::new(config),
            fetcher,
            scheduler,
        }
    }

    /// Runs every configured topic sequentially
    ///
    /// Page failures do not fail the run; they are listed in each topic's
    /// report. A pipeline that cannot be drained does fail the run.
    pub async fn run(&self) -> Result<HarvestSummary> {
        info!(topics = self.config.search.topics.len(), "Crawl starting");

        let mut summary = HarvestSummary::default();
        for topic in &self.config.search.topics {
            let report = self.run_topic(topic).await?;
            summary.topics.push(report);
        }

        info!(
            rows = summary.total_rows(),
            failed_pages = summary.total_failed_pages(),
            "Crawl complete"
        );
        Ok(summary)
    }

    /// Harvests a single topic into its own destination
    pub async fn run_topic(&self, topic: &str) -> Result<TopicReport> {
        let output = &self.config.output;
        let path = destination_for(Path::new(&output.directory), topic, output.format);
        let store = open_store(&path, output.format)?;

        let pipeline = Arc::new(SinkPipeline::with_batch_limit(
            store,
            self.config.crawler.batch_limit,
        ));
        let destination = pipeline.destination().to_string();

        let template = PageQuery::new(
            topic,
            &self.config.search.location,
            &self.config.search.locality,
            0,
        );

        info!(topic, destination = %destination, "Harvesting topic");
        let started_at = Utc::now();
        let start = Instant::now();

        let crawl = self
            .scheduler
            .run(
                Arc::clone(&self.fetcher),
                Arc::clone(&pipeline),
                &template,
                self.config.crawler.pages,
            )
            .await;

        let stats = close_pipeline(&pipeline)?;

        if !crawl.is_complete() {
            warn!(topic, failed_pages = ?crawl.failed_pages(), "Topic finished with failed pages");
        }

        Ok(TopicReport {
            topic: topic.to_string(),
            destination,
            started_at,
            duration: start.elapsed(),
            crawl,
            pipeline: stats,
        })
    }
}

/// Closes a pipeline, retrying once if the final flush fails
///
/// When every attempt fails the returned error names how many records were
/// still queued; they are dropped with the pipeline.
fn close_pipeline<S: RecordStore>(pipeline: &SinkPipeline<S>) -> StorageResult<PipelineStats> {
    let mut attempt = 1;
    loop {
        match pipeline.close() {
            Ok(stats) => return Ok(stats),
            Err(e) if attempt < CLOSE_ATTEMPTS => {
                warn!(
                    destination = %pipeline.destination(),
                    attempt,
                    error = %e,
                    "Closing pipeline failed, retrying"
                );
                attempt += 1;
            }
            Err(e) => {
                let unflushed = pipeline.pending_len();
                error!(
                    destination = %pipeline.destination(),
                    unflushed,
                    error = %e,
                    "Closing pipeline failed, records lost"
                );
                return Err(StorageError::Write {
                    destination: pipeline.destination().to_string(),
                    message: format!("{} records left unflushed after close: {}", unflushed, e),
                });
            }
        }
    }
}

/// Runs the main harvest operation over HTTP
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::load_config;
/// use listing_harvest::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_harvest(config).await?;
/// println!("{} rows", summary.total_rows());
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config) -> Result<HarvestSummary> {
    Driver::new(config)?.run().await
}
