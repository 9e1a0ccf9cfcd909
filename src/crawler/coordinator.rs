//! Crawl coordinator - main crawl orchestration logic
//!
//! This module drives one run through its phases:
//! - Resolving the listing URL (given or resumed)
//! - Loading and reconciling stored progress and records
//! - Reading the listing's total entry count
//! - Paging: fetch, extract, persist records, persist offset, pause
//!
//! Records are persisted before the offset after every page, and both before
//! the pause, so killing the process at any point loses at most the page in
//! flight.

use crate::config::Config;
use crate::crawler::extractor::{Extractor, VocabularyListExtractor};
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchPolicy};
use crate::crawler::pacing::PageDelay;
use crate::listing::{normalize_listing_url, page_url};
use crate::state::{CrawlPhase, StopReason};
use crate::storage::{
    open_progress_store, open_result_store, ProgressStore, ResultStore, VocabularyRecord,
};
use crate::HarvestError;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Instant;
use url::Url;

/// Where the listing URL of a run comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    /// An explicitly supplied listing URL
    Url(String),
    /// The most recently used listing recorded in the progress store
    ResumeLast,
}

/// What the caller asks a run to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub source: ListingSource,

    /// Ignore the stored offset and records and start from the first page
    pub fresh: bool,
}

impl CrawlRequest {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            source: ListingSource::Url(url.into()),
            fresh: false,
        }
    }

    pub fn resume_last() -> Self {
        Self {
            source: ListingSource::ResumeLast,
            fresh: false,
        }
    }
}

/// Summary of one finished run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub listing_key: String,
    pub records_path: PathBuf,
    pub start_offset: u64,
    pub final_offset: u64,
    /// Server-reported entry count (0 if it could not be read)
    pub total_entries: u64,
    pub pages_fetched: u32,
    pub records_added: usize,
    pub total_records: usize,
    pub stop_reason: StopReason,
}

/// Result of harvesting a single page
enum PageOutcome {
    Harvested { count: usize, continuation: bool },
    Empty,
    Unavailable,
}

/// Main crawl coordinator structure
pub struct Coordinator {
    config: Config,
    progress: Box<dyn ProgressStore>,
    results: Box<dyn ResultStore>,
    extractor: Box<dyn Extractor>,
    client: Client,
    policy: FetchPolicy,
    pacing: PageDelay,
    phase: CrawlPhase,
}

impl Coordinator {
    /// Creates a coordinator with the stores and extractor the config describes
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - A store, the extractor or the client failed to initialize
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let progress = open_progress_store(&config.output)?;
        let results = Box::new(open_result_store(&config.output)?);
        let extractor = Box::new(VocabularyListExtractor::from_config(&config.markup)?);
        Self::with_components(config, progress, results, extractor)
    }

    /// Creates a coordinator around caller-supplied stores and extractor
    pub fn with_components(
        config: Config,
        progress: Box<dyn ProgressStore>,
        results: Box<dyn ResultStore>,
        extractor: Box<dyn Extractor>,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client()?;
        let policy = FetchPolicy::from_config(&config)?;
        let pacing = PageDelay::from_config(&config.crawler);

        Ok(Self {
            config,
            progress,
            results,
            extractor,
            client,
            policy,
            pacing,
            phase: CrawlPhase::ResolveSource,
        })
    }

    /// The phase the last (or current) run is in
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    fn advance(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Runs one crawl
    ///
    /// A listing that cannot be resolved and a progress store that cannot be
    /// read are errors, raised before anything is written. Every failure
    /// after that ends the run with a [`StopReason`] and leaves the last
    /// committed page as the resume point.
    pub async fn run(&mut self, request: CrawlRequest) -> Result<CrawlReport, HarvestError> {
        self.phase = CrawlPhase::ResolveSource;
        let started = Instant::now();

        let listing_key = match self.resolve_source(&request.source) {
            Ok(key) => key,
            Err(e) => {
                tracing::error!("Cannot start crawl: {}", e);
                self.advance(CrawlPhase::Abort)?;
                return Err(e);
            }
        };
        tracing::info!("Listing: {}", listing_key);

        self.advance(CrawlPhase::ResumeOrFresh)?;
        let (start_offset, mut records) = match self.resume_or_fresh(&listing_key, request.fresh) {
            Ok(resumed) => resumed,
            Err(e) => {
                tracing::error!("Cannot read stored progress, nothing was changed: {}", e);
                self.advance(CrawlPhase::Abort)?;
                return Err(e);
            }
        };
        let existing = records.len();
        tracing::info!("Resuming from offset: {}", start_offset);
        tracing::info!("Already harvested {} entries for this listing", existing);

        self.advance(CrawlPhase::FetchTotal)?;
        let total = self.fetch_total(&listing_key).await;

        let (stop_reason, final_offset, pages_fetched) = match total {
            Some(total) => {
                self.advance(CrawlPhase::Paging)?;
                self.page_loop(&listing_key, start_offset, total, &mut records)
                    .await
            }
            None => (StopReason::TotalUnknown, start_offset, 0),
        };

        self.advance(CrawlPhase::Done)?;

        let report = CrawlReport {
            records_path: self.results.location(&listing_key),
            listing_key,
            start_offset,
            final_offset,
            total_entries: total.unwrap_or(0),
            pages_fetched,
            records_added: records.len() - existing,
            total_records: records.len(),
            stop_reason,
        };

        if report.stop_reason.is_complete() {
            tracing::info!(
                "Crawl finished: {} ({} pages, {} new entries, {:?})",
                report.stop_reason,
                report.pages_fetched,
                report.records_added,
                started.elapsed()
            );
        } else {
            tracing::warn!(
                "Crawl stopped early: {} ({} pages, {} new entries); rerun to resume",
                report.stop_reason,
                report.pages_fetched,
                report.records_added
            );
        }

        Ok(report)
    }

    /// RESOLVE_SOURCE: picks and normalizes the listing URL
    fn resolve_source(&self, source: &ListingSource) -> Result<String, HarvestError> {
        let raw = match source {
            ListingSource::Url(url) => url.clone(),
            ListingSource::ResumeLast => match self.progress.load_last_listing() {
                Ok(Some(key)) => {
                    tracing::info!("Last listing: {}", key);
                    key
                }
                Ok(None) => return Err(HarvestError::NoListing),
                Err(e) => {
                    tracing::warn!("Unable to read the last listing: {}", e);
                    return Err(HarvestError::NoListing);
                }
            },
        };

        normalize_listing_url(&raw, &self.config.crawler.listing_suffix)
    }

    /// RESUME_OR_FRESH: returns the starting offset and the records to extend
    ///
    /// Fails without writing anything when the stored offset cannot be read.
    fn resume_or_fresh(
        &mut self,
        listing_key: &str,
        fresh: bool,
    ) -> Result<(u64, Vec<VocabularyRecord>), HarvestError> {
        let offset = self.progress.load_offset(listing_key)?;

        if let Err(e) = self.progress.save_last_listing(listing_key) {
            tracing::warn!("Unable to record last listing: {}", e);
        }

        if fresh {
            tracing::info!("Fresh crawl requested; ignoring stored progress");
            return Ok((0, Vec::new()));
        }

        let mut records = match self.results.load(listing_key) {
            Ok(Some(result)) => result.entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    "Records file {} is unreadable: {}",
                    self.results.location(listing_key).display(),
                    e
                );
                match self.results.quarantine(listing_key) {
                    Ok(Some(moved)) => tracing::warn!("Moved it aside to {}", moved.display()),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Unable to move it aside: {}", e),
                }
                Vec::new()
            }
        };

        if offset != 0 && records.is_empty() {
            tracing::info!(
                "No records found for {} at offset {}. Starting fresh.",
                listing_key,
                offset
            );
            return Ok((0, records));
        }

        let step = self.config.crawler.page_step;
        let offset = match records.iter().map(|r| r.sequence_id).max() {
            Some(last_id) if offset == 0 => {
                let recovered = page_boundary(last_id, step);
                tracing::warn!(
                    "No stored offset for {} but {} records exist; resuming at {}",
                    listing_key,
                    records.len(),
                    recovered
                );
                recovered
            }
            _ => offset,
        };

        let reconciled = reconcile(offset, &mut records, step);
        if reconciled != offset {
            tracing::warn!(
                "Stored offset {} has no matching records; resuming at {}",
                offset,
                reconciled
            );
        }

        Ok((reconciled, records))
    }

    /// FETCH_TOTAL: reads the entry count from the listing's first page
    ///
    /// `None` means the count is unknown; the run then pages nothing, as if
    /// the listing were empty.
    async fn fetch_total(&self, listing_key: &str) -> Option<u64> {
        let url = match Url::parse(listing_key) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Unable to build listing URL: {}", e);
                return None;
            }
        };

        let total = match fetch_page(&self.client, &url, &self.policy).await {
            Some(document) => self.extractor.total_entries(&document),
            None => {
                tracing::error!("Unable to fetch page {}", url);
                return None;
            }
        };

        match total {
            Some(total) => {
                tracing::info!("Listing reports {} entries", total);
                Some(total)
            }
            None => {
                tracing::error!("Unable to find total entries text");
                None
            }
        }
    }

    /// PAGING: returns why the loop stopped, the next offset, and pages fetched
    async fn page_loop(
        &mut self,
        listing_key: &str,
        start_offset: u64,
        total: u64,
        records: &mut Vec<VocabularyRecord>,
    ) -> (StopReason, u64, u32) {
        let step = self.config.crawler.page_step;
        let budget = self.config.crawler.max_pages;
        let mut offset = start_offset;
        let mut pages = 0u32;

        let reason = loop {
            if offset >= total {
                break StopReason::Completed;
            }
            if budget.map_or(false, |limit| pages >= limit) {
                break StopReason::PageBudget { pages };
            }

            let outcome = match self.harvest_page(listing_key, offset, records).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("An error occurred during parsing at offset {}: {}", offset, e);
                    break StopReason::Failed {
                        offset,
                        message: e.to_string(),
                    };
                }
            };

            match outcome {
                PageOutcome::Unavailable => {
                    tracing::error!("Unable to fetch data at offset {}", offset);
                    break StopReason::PageUnavailable { offset };
                }
                PageOutcome::Empty => {
                    let remaining = total - offset;
                    tracing::warn!(
                        "Page at offset {} has no entries but the listing reports {} more; \
                         the page markup may have changed",
                        offset,
                        remaining
                    );
                    break StopReason::EmptyPage { offset, remaining };
                }
                PageOutcome::Harvested {
                    count,
                    continuation,
                } => {
                    pages += 1;
                    offset += step;
                    tracing::info!(
                        "Harvested {} entries ({}/{})",
                        count,
                        records.len(),
                        total
                    );

                    if !continuation {
                        break StopReason::NoContinuation;
                    }
                    let budget_left = budget.map_or(true, |limit| pages < limit);
                    if offset < total && budget_left {
                        self.pacing.pause().await;
                    }
                }
            }
        };

        (reason, offset, pages)
    }

    /// Fetches, extracts and persists the page at `offset`
    async fn harvest_page(
        &mut self,
        listing_key: &str,
        offset: u64,
        records: &mut Vec<VocabularyRecord>,
    ) -> Result<PageOutcome, HarvestError> {
        let url = page_url(listing_key, offset)?;
        tracing::debug!("Fetching {}", url);

        let extraction = match fetch_page(&self.client, &url, &self.policy).await {
            Some(document) => self.extractor.extract(&document, offset),
            None => return Ok(PageOutcome::Unavailable),
        };

        if extraction.records.is_empty() {
            return Ok(PageOutcome::Empty);
        }

        let count = extraction.records.len();
        let committed = records.len();
        records.extend(extraction.records);

        if let Err(e) = self.results.save(listing_key, records) {
            records.truncate(committed);
            return Err(e.into());
        }
        self.progress
            .save_offset(listing_key, offset + self.config.crawler.page_step)?;

        Ok(PageOutcome::Harvested {
            count,
            continuation: extraction.continuation,
        })
    }
}

/// Aligns a stored offset with the records actually on disk
///
/// Records past the offset belong to a page whose offset was never
/// committed and are dropped (the page is fetched again). If the offset is
/// ahead of the last stored record by a whole page or more, it is moved back
/// to the page boundary after that record.
pub(crate) fn reconcile(offset: u64, records: &mut Vec<VocabularyRecord>, step: u64) -> u64 {
    let before = records.len();
    records.retain(|r| r.sequence_id <= offset);
    if records.len() != before {
        tracing::warn!(
            "Dropping {} records past committed offset {}",
            before - records.len(),
            offset
        );
    }

    let last_id = records.iter().map(|r| r.sequence_id).max().unwrap_or(0);
    let boundary = page_boundary(last_id, step);
    if boundary < offset {
        records.retain(|r| r.sequence_id <= boundary);
        boundary
    } else {
        offset
    }
}

/// Offset of the page following the one that holds `last_id`
fn page_boundary(last_id: u64, step: u64) -> u64 {
    last_id.div_ceil(step) * step
}

/// Runs a complete crawl with stores opened from `config`
///
/// # Example
///
/// ```no_run
/// use kotoba_harvest::config::Config;
/// use kotoba_harvest::crawler::{run_crawl, CrawlRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(
///     Config::default(),
///     CrawlRequest::url("https://jpdb.io/novel/5829/kino-no-tabi"),
/// )
/// .await?;
/// println!("{} entries in {}", report.total_records, report.records_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, request: CrawlRequest) -> Result<CrawlReport, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run(request).await
}
