//! Crawler module for listing page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retries
//! - HTML parsing into listing records
//! - Fanning a page range out over a worker pool
//! - Driving topics one after another

mod driver;
mod fetcher;
mod parser;
mod scheduler;

pub use driver::{run_harvest, Driver};
pub use fetcher::{
    build_http_client, fetch_with_retry, FetchError, HttpFetcher, PageFetcher, PageQuery,
    PAGE_SIZE,
};
pub use parser::{parse_listing, ParseError};
pub use scheduler::{CrawlReport, PageFailure, Scheduler};
