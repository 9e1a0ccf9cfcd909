use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Kotoba-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub markup: MarkupConfig,
    pub output: OutputConfig,
}

/// Pagination, retry and pacing behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of entries the listing shows per page (offset increment)
    pub page_step: u64,

    /// Attempts per page before it is considered unavailable
    pub retries: u32,

    /// Per-attempt request timeout (milliseconds)
    pub timeout_ms: u64,

    /// Pause after a failed attempt (milliseconds)
    pub retry_delay_ms: u64,

    /// Lower bound of the randomized pause between pages (milliseconds)
    pub min_page_delay_ms: u64,

    /// Upper bound of the randomized pause between pages (milliseconds)
    pub max_page_delay_ms: u64,

    /// Path segment every listing URL ends with
    pub listing_suffix: String,

    /// Stop after this many pages in one run
    pub max_pages: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_step: 50,
            retries: 3,
            timeout_ms: 2_000,
            retry_delay_ms: 5_000,
            min_page_delay_ms: 2_000,
            max_page_delay_ms: 5_000,
            listing_suffix: "vocabulary-list".to_string(),
            max_pages: None,
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Request header configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Optional Accept-Language header
    pub accept_language: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            accept_language: None,
        }
    }
}

/// Where the extractor finds each field on a listing page
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MarkupConfig {
    /// CSS selector of one entry container
    pub entry_selector: String,

    /// CSS selector (within an entry) of the frequency tag element
    pub tag_selector: String,

    /// Attribute of the tag element holding `category:value` tokens
    pub tag_attribute: String,

    /// Regex matched against `<p>` text; first capture group is the total
    pub caption_pattern: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            entry_selector: "div.entry".to_string(),
            tag_selector: "div.tag.tooltip".to_string(),
            tag_attribute: "data-tooltip".to_string(),
            caption_pattern: r"Showing \d+\.\.\d+ from (\d+) entries".to_string(),
        }
    }
}

/// Which durable store keeps the pagination offsets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBackend {
    /// A single shared JSON document
    #[default]
    Json,
    /// An SQLite database with per-key upserts
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the shared progress document (or database)
    pub progress_path: PathBuf,

    /// Storage backend for the progress document
    pub progress_backend: ProgressBackend,

    /// Directory receiving one records file per listing
    pub records_dir: PathBuf,

    /// Regex whose first capture group names the records file
    pub identity_pattern: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            progress_path: PathBuf::from("progress.json"),
            progress_backend: ProgressBackend::Json,
            records_dir: PathBuf::from("."),
            identity_pattern: r"novel/\d+/([^/]+)".to_string(),
        }
    }
}
