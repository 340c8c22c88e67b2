//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Building the search URL for one result page
//! - Classifying failures as transient fetch errors
//! - The bounded retry loop around single fetch attempts

use crate::config::{Config, UserAgentConfig};
use crate::crawler::parser::{parse_listing, ParseError};
use crate::record::Record;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

/// Number of results per listing page; `start` advances by this much
pub const PAGE_SIZE: usize = 10;

/// One page of one topic's search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Search keywords
    pub topic: String,
    /// Country code
    pub location: String,
    /// Human-readable locality
    pub locality: String,
    /// Zero-based page number
    pub page_index: usize,
}

impl PageQuery {
    pub fn new(
        topic: impl Into<String>,
        location: impl Into<String>,
        locality: impl Into<String>,
        page_index: usize,
    ) -> Self {
        Self {
            topic: topic.into(),
            location: location.into(),
            locality: locality.into(),
            page_index,
        }
    }

    /// Same search, different page
    pub fn for_page(&self, page_index: usize) -> Self {
        Self {
            page_index,
            ..self.clone()
        }
    }

    /// Result offset sent as the `start` parameter
    pub fn offset(&self) -> usize {
        self.page_index * PAGE_SIZE
    }
}

/// A failed fetch attempt; always eligible for retry
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("received status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("failed to parse {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },
}

/// A source of listing records, one page per call
///
/// Implementations make a single attempt; retrying is the caller's job
/// (see [`fetch_with_retry`]).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Record>, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL)
    let user_agent = format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches search-result pages over HTTP and parses them into records
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
}

impl HttpFetcher {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Builds the client and endpoint from configuration
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.user_agent)?;
        let base_url = Url::parse(&config.search.base_url)?;
        Ok(Self::new(client, base_url))
    }

    /// Builds the request URL for one page
    ///
    /// Query values are form-encoded, so spaces become `+`:
    /// `?keywords=software+engineer&location=United+States&original_referer=&start=20`
    pub fn search_url(&self, query: &PageQuery) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("keywords", &query.topic)
            .append_pair("location", &query.locality)
            .append_pair("original_referer", "")
            .append_pair("start", &query.offset().to_string());
        url
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Record>, FetchError> {
        let url = self.search_url(query);
        let url_str = url.to_string();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(&url_str, &e))?;

        let status = response.status();
        info!(status = status.as_u16(), url = %url_str, "Received response");

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| network_error(&url_str, &e))?;

        let records = parse_listing(&body).map_err(|source| FetchError::Parse {
            url: url_str.clone(),
            source,
        })?;

        debug!(url = %url_str, records = records.len(), "Parsed page");
        Ok(records)
    }
}

/// Classifies a transport error
fn network_error(url: &str, e: &reqwest::Error) -> FetchError {
    let message = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    };

    FetchError::Network {
        url: url.to_string(),
        message,
    }
}

/// Fetches a page, retrying every failure immediately
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Non-200 status | Retry, no delay |
/// | Network error | Retry, no delay |
/// | Parse failure | Retry, no delay |
/// | `1 + max_retries` failures | `MaxRetriesExceeded` |
///
/// # Arguments
///
/// * `fetcher` - The fetcher making single attempts
/// * `query` - The page to fetch
/// * `max_retries` - Attempts allowed after the first
///
/// # Returns
///
/// * `Ok(Vec<Record>)` - Records from the first successful attempt
/// * `Err(HarvestError::MaxRetriesExceeded)` - Every attempt failed
pub async fn fetch_with_retry<F>(
    fetcher: &F,
    query: &PageQuery,
    max_retries: u32,
) -> Result<Vec<Record>, HarvestError>
where
    F: PageFetcher + ?Sized,
{
    let max_attempts = max_retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match fetcher.fetch_page(query).await {
            Ok(records) => {
                info!(
                    topic = %query.topic,
                    page_index = query.page_index,
                    attempt,
                    records = records.len(),
                    "Successfully parsed page"
                );
                return Ok(records);
            }
            Err(e) if attempt >= max_attempts => {
                error!(
                    topic = %query.topic,
                    page_index = query.page_index,
                    attempts = attempt,
                    error = %e,
                    "Max retries exceeded"
                );
                return Err(HarvestError::MaxRetriesExceeded {
                    page_index: query.page_index,
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                warn!(
                    topic = %query.topic,
                    page_index = query.page_index,
                    attempt,
                    retries_left = max_attempts - attempt,
                    error = %e,
                    "Fetch failed, retrying"
                );
            }
        }
    }
}
