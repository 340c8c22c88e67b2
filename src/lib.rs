//! Listing-Harvest: a bounded-concurrency search listing crawler
//!
//! This crate fetches paginated search-result listings for a set of topics,
//! extracts one record per result block, deduplicates records per topic and
//! appends them to a record store in size-bounded batches.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Max retries exceeded for page {page_index} after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        page_index: usize,
        attempts: u32,
        last_error: crawler::FetchError,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{AddOutcome, SinkPipeline};
pub use record::Record;
