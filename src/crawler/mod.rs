//! Crawler module for paging through a vocabulary listing
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry logic
//! - Entry extraction from listing pages
//! - Randomized pauses between pages
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod pacing;

pub use coordinator::{run_crawl, Coordinator, CrawlReport, CrawlRequest, ListingSource};
pub use extractor::{Extraction, Extractor, VocabularyListExtractor};
pub use fetcher::{build_http_client, fetch_page, FetchPolicy};
pub use pacing::PageDelay;

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the progress and result stores
/// 2. Resolve the listing and its resume point
/// 3. Read the listing's entry count
/// 4. Page through the listing, persisting after every page
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `request` - Which listing to crawl and whether to start over
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run ended; see its stop reason
/// * `Err(HarvestError)` - No usable listing or a store could not be opened
pub async fn crawl(config: Config, request: CrawlRequest) -> Result<CrawlReport, HarvestError> {
    run_crawl(config, request).await
}
