//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester:
//! - Building the HTTP client and the request headers
//! - Per-attempt timeouts
//! - Fixed-delay retries for transport errors and non-success statuses
//! - Decoding every body as UTF-8 regardless of the declared charset

use crate::config::{Config, HttpConfig};
use crate::ConfigError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use scraper::Html;
use std::time::Duration;
use url::Url;

/// How a single page is requested and retried
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Headers sent with every attempt
    pub headers: HeaderMap,

    /// Total attempts before the page is reported unavailable
    pub retries: u32,

    /// Timeout applied to each attempt
    pub timeout: Duration,

    /// Pause after every failed attempt
    pub delay: Duration,
}

impl FetchPolicy {
    /// Builds the policy from the crawler and HTTP sections of the config
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            headers: build_headers(&config.http)?,
            retries: config.crawler.retries,
            timeout: config.crawler.timeout(),
            delay: config.crawler.retry_delay(),
        })
    }
}

/// Builds the request headers from the HTTP configuration
pub fn build_headers(config: &HttpConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    let user_agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|e| ConfigError::Validation(format!("Invalid user_agent: {}", e)))?;
    headers.insert(USER_AGENT, user_agent);

    if let Some(language) = &config.accept_language {
        let language = HeaderValue::from_str(language)
            .map_err(|e| ConfigError::Validation(format!("Invalid accept_language: {}", e)))?;
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    Ok(headers)
}

/// Builds the HTTP client shared by every request of a run
///
/// Timeouts are applied per request from the [`FetchPolicy`], so the client
/// itself only carries connection-level settings.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one listing page and parses it
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Parse body, return document |
/// | Non-2xx status | Log, sleep `delay`, retry |
/// | Timeout / connection error | Log, sleep `delay`, retry |
/// | `retries` attempts failed | Return `None` |
///
/// `None` means "page unavailable"; it says nothing about whether the
/// listing has more entries.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The page URL
/// * `policy` - Headers, attempt count, timeout and retry delay
pub async fn fetch_page(client: &Client, url: &Url, policy: &FetchPolicy) -> Option<Html> {
    fetch_body(client, url, policy)
        .await
        .map(|body| Html::parse_document(&body))
}

/// Same as [`fetch_page`] but returns the decoded body unparsed
pub async fn fetch_body(client: &Client, url: &Url, policy: &FetchPolicy) -> Option<String> {
    for attempt in 1..=policy.retries {
        match fetch_once(client, url, policy).await {
            Ok(body) => {
                tracing::debug!("Fetched {} ({} bytes)", url, body.len());
                return Some(body);
            }
            Err(e) => {
                tracing::warn!(
                    "Error while fetching {} (attempt {}/{}): {}",
                    url,
                    attempt,
                    policy.retries,
                    describe_error(&e)
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }

    tracing::error!("Giving up on {} after {} attempts", url, policy.retries);
    None
}

async fn fetch_once(client: &Client, url: &Url, policy: &FetchPolicy) -> Result<String, reqwest::Error> {
    let response = client
        .get(url.clone())
        .headers(policy.headers.clone())
        .timeout(policy.timeout)
        .send()
        .await?
        .error_for_status()?;

    let bytes = response.bytes().await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else if let Some(status) = e.status() {
        format!("HTTP {}", status)
    } else {
        e.to_string()
    }
}
