use serde::Deserialize;

/// Main configuration structure for Listing-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub search: SearchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of result pages fetched per topic
    #[serde(default = "default_pages")]
    pub pages: usize,

    /// Number of concurrent page workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Additional attempts after the first failed fetch of a page
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pending records that trigger a flush to the record store
    #[serde(rename = "batch-limit", default = "default_batch_limit")]
    pub batch_limit: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            pages: default_pages(),
            workers: default_workers(),
            max_retries: default_max_retries(),
            batch_limit: default_batch_limit(),
        }
    }
}

fn default_pages() -> usize {
    3
}

fn default_workers() -> usize {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_batch_limit() -> usize {
    50
}

/// Search endpoint and query configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Listing endpoint, without query string
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Country code (e.g. "us")
    pub location: String,

    /// Human-readable locality sent as the `location` query parameter
    pub locality: String,

    /// Search keywords, one output destination each
    #[serde(default)]
    pub topics: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives one destination per topic
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Record store backend
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            format: OutputFormat::default(),
        }
    }
}

fn default_directory() -> String {
    ".".to_string()
}

/// Record store backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Sqlite,
}

impl OutputFormat {
    /// File extension used for destinations of this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Optional API credentials
///
/// Loaded for completeness; requests are sent without them.
#[derive(Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(rename = "api-key")]
    pub api_key: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
