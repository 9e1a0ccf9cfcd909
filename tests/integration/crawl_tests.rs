//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a paginated vocabulary listing and run
//! the full crawl cycle end-to-end against temporary stores.

use kotoba_harvest::config::{Config, ProgressBackend};
use kotoba_harvest::crawler::{Coordinator, CrawlReport, CrawlRequest, VocabularyListExtractor};
use kotoba_harvest::listing::IdentityResolver;
use kotoba_harvest::state::{CrawlPhase, StopReason};
use kotoba_harvest::storage::{
    JsonProgressStore, JsonResultStore, ListingResult, ProgressStore, ResultStore,
    SqliteProgressStore, StorageResult, VocabularyRecord,
};
use kotoba_harvest::HarvestError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/novel/5829/kino-no-tabi/vocabulary-list";
const TOTAL: u64 = 120;

/// Renders a listing page holding entries `offset + 1 ..= offset + count`
fn listing_page(offset: u64, count: u64, total: u64) -> String {
    let mut entries = String::new();
    for id in offset + 1..=offset + count {
        entries.push_str(&format!(
            r#"<div class="entry">
                <a href="/vocabulary/{id}"><ruby>語<rt>ご</rt></ruby>{id}</a>
                <div class="tag tooltip" data-tooltip="Novel:{id} Anime:2">Top</div>
                <div>meaning {id}; sense {id}</div>
            </div>"#,
            id = id
        ));
    }

    format!(
        r#"<html><body>
        <p>Showing {}..{} from {} entries</p>
        {}
        </body></html>"#,
        offset + 1,
        offset + count,
        total,
        entries
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Mounts one page of the listing at `offset`
async fn mount_page(server: &MockServer, offset: u64, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("offset", offset.to_string().as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts the first page served without an offset (the total count request)
async fn mount_first_page(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Mounts a healthy 120-entry listing
async fn mount_listing(server: &MockServer) {
    for offset in (0..TOTAL).step_by(50) {
        let count = (TOTAL - offset).min(50);
        mount_page(server, offset, html(listing_page(offset, count, TOTAL))).await;
    }
    mount_first_page(server, listing_page(0, 50, TOTAL)).await;
}

/// Creates a test configuration writing into `dir`
fn create_test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.retries = 2;
    config.crawler.retry_delay_ms = 0;
    config.crawler.min_page_delay_ms = 0;
    config.crawler.max_page_delay_ms = 0;
    config.output.progress_path = dir.join("progress.json");
    config.output.records_dir = dir.to_path_buf();
    config
}

fn listing_url(server: &MockServer) -> String {
    format!("{}/novel/5829/kino-no-tabi", server.uri())
}

fn listing_key(server: &MockServer) -> String {
    format!("{}{}", server.uri(), LISTING_PATH)
}

fn records_path(dir: &TempDir, server: &MockServer) -> PathBuf {
    let resolver = IdentityResolver::new(&Config::default().output.identity_pattern).unwrap();
    dir.path()
        .join(format!("{}.json", resolver.stem_for(&listing_key(server))))
}

fn read_records(dir: &TempDir, server: &MockServer) -> Vec<VocabularyRecord> {
    let content =
        std::fs::read_to_string(records_path(dir, server)).expect("records file missing");
    serde_json::from_str(&content).expect("records file is not valid JSON")
}

fn assert_contiguous(records: &[VocabularyRecord], count: u64) {
    let ids: Vec<u64> = records.iter().map(|r| r.sequence_id).collect();
    let expected: Vec<u64> = (1..=count).collect();
    assert_eq!(ids, expected);
}

/// Offsets of every paged request the server saw, in arrival order
async fn requested_offsets(server: &MockServer) -> Vec<u64> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == "offset")
                .and_then(|(_, v)| v.parse().ok())
        })
        .collect()
}

async fn run(config: Config, request: CrawlRequest) -> CrawlReport {
    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let report = coordinator.run(request).await.expect("Crawl failed");
    assert_eq!(coordinator.phase(), CrawlPhase::Done);
    report
}

#[tokio::test]
async fn test_full_crawl_from_scratch() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_eq!(report.listing_key, listing_key(&server));
    assert_eq!(report.records_path, records_path(&dir, &server));
    assert_eq!(report.start_offset, 0);
    assert_eq!(report.final_offset, 150);
    assert_eq!(report.total_entries, TOTAL);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.records_added, 120);

    let records = read_records(&dir, &server);
    assert_contiguous(&records, TOTAL);
    assert_eq!(records[0].word, "語1");
    assert_eq!(records[0].reading, "ご1");
    assert_eq!(records[0].meanings, vec!["meaning 1", "sense 1"]);
    assert_eq!(records[0].frequency_tags["novel"], "1");
    assert_eq!(records[0].frequency_tags["anime"], "2");

    let progress = JsonProgressStore::new(&dir.path().join("progress.json"));
    assert_eq!(progress.load_offset(&listing_key(&server)).unwrap(), 150);
    assert_eq!(
        progress.load_last_listing().unwrap(),
        Some(listing_key(&server))
    );
}

#[tokio::test]
async fn test_offsets_are_requested_in_order() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(requested_offsets(&server).await, vec![0, 50, 100]);
}

#[tokio::test]
async fn test_rerun_after_completion_changes_nothing() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;
    let before = std::fs::read(records_path(&dir, &server)).unwrap();
    server.reset().await;
    mount_listing(&server).await;

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_eq!(report.pages_fetched, 0);
    assert_eq!(report.records_added, 0);
    assert!(requested_offsets(&server).await.is_empty());
    assert_eq!(std::fs::read(records_path(&dir, &server)).unwrap(), before);
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_without_gaps() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(dir.path());
    config.crawler.max_pages = Some(1);
    let first = run(config, CrawlRequest::url(listing_url(&server))).await;

    assert_eq!(first.stop_reason, StopReason::PageBudget { pages: 1 });
    assert_eq!(first.final_offset, 50);
    assert_contiguous(&read_records(&dir, &server), 50);

    let second = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(second.stop_reason, StopReason::Completed);
    assert_eq!(second.start_offset, 50);
    assert_eq!(second.records_added, 70);
    assert_contiguous(&read_records(&dir, &server), TOTAL);
    assert_eq!(requested_offsets(&server).await, vec![0, 50, 100]);
}

#[tokio::test]
async fn test_records_past_committed_offset_are_refetched_once() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(dir.path());
    config.crawler.max_pages = Some(2);
    run(config, CrawlRequest::url(listing_url(&server))).await;
    assert_contiguous(&read_records(&dir, &server), 100);

    // Records of the second page saved, its offset commit lost
    let mut progress = JsonProgressStore::new(&dir.path().join("progress.json"));
    progress.save_offset(&listing_key(&server), 50).unwrap();

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(report.start_offset, 50);
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_contiguous(&read_records(&dir, &server), TOTAL);
}

#[tokio::test]
async fn test_offset_without_records_starts_over() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let mut progress = JsonProgressStore::new(&dir.path().join("progress.json"));
    progress.save_offset(&listing_key(&server), 200).unwrap();

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(report.start_offset, 0);
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_contiguous(&read_records(&dir, &server), TOTAL);
}

#[tokio::test]
async fn test_corrupt_records_file_is_moved_aside() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    std::fs::write(records_path(&dir, &server), "[{\"id\": 1, \"word\":").unwrap();
    let mut progress = JsonProgressStore::new(&dir.path().join("progress.json"));
    progress.save_offset(&listing_key(&server), 50).unwrap();

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(report.start_offset, 0);
    assert_contiguous(&read_records(&dir, &server), TOTAL);

    let quarantined = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
        .count();
    assert_eq!(quarantined, 1);
}

#[tokio::test]
async fn test_unavailable_page_keeps_last_commit() {
    let server = MockServer::start().await;
    mount_page(&server, 50, ResponseTemplate::new(500)).await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(report.stop_reason, StopReason::PageUnavailable { offset: 50 });
    assert_eq!(report.final_offset, 50);
    assert_contiguous(&read_records(&dir, &server), 50);
    // One attempt per configured retry
    assert_eq!(requested_offsets(&server).await, vec![0, 50, 50]);

    let progress = JsonProgressStore::new(&dir.path().join("progress.json"));
    assert_eq!(progress.load_offset(&listing_key(&server)).unwrap(), 50);
}

#[tokio::test]
async fn test_empty_page_with_entries_remaining_stops_with_warning() {
    let server = MockServer::start().await;
    mount_page(&server, 50, html(listing_page(50, 0, TOTAL))).await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(
        report.stop_reason,
        StopReason::EmptyPage {
            offset: 50,
            remaining: 70
        }
    );
    assert!(!report.stop_reason.is_complete());
    assert_contiguous(&read_records(&dir, &server), 50);
}

#[tokio::test]
async fn test_missing_caption_pages_nothing() {
    let server = MockServer::start().await;
    mount_first_page(&server, "<html><body><p>Nothing here</p></body></html>".to_string()).await;
    let dir = TempDir::new().unwrap();

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(report.stop_reason, StopReason::TotalUnknown);
    assert_eq!(report.total_entries, 0);
    assert!(requested_offsets(&server).await.is_empty());
    assert!(!records_path(&dir, &server).exists());
}

#[tokio::test]
async fn test_resume_last_listing() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(dir.path());
    config.crawler.max_pages = Some(1);
    run(config, CrawlRequest::url(listing_url(&server))).await;

    let report = run(create_test_config(dir.path()), CrawlRequest::resume_last()).await;

    assert_eq!(report.listing_key, listing_key(&server));
    assert_eq!(report.start_offset, 50);
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_contiguous(&read_records(&dir, &server), TOTAL);
}

#[tokio::test]
async fn test_resume_without_history_fails() {
    let dir = TempDir::new().unwrap();
    let mut coordinator =
        Coordinator::new(create_test_config(dir.path())).expect("Failed to create coordinator");

    let result = coordinator.run(CrawlRequest::resume_last()).await;

    assert!(matches!(result, Err(HarvestError::NoListing)));
    assert_eq!(coordinator.phase(), CrawlPhase::Abort);
}

#[tokio::test]
async fn test_fresh_crawl_replaces_records() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest {
            fresh: true,
            ..CrawlRequest::url(listing_url(&server))
        },
    )
    .await;

    assert_eq!(report.start_offset, 0);
    assert_eq!(report.pages_fetched, 3);
    assert_contiguous(&read_records(&dir, &server), TOTAL);
}

#[tokio::test]
async fn test_sqlite_progress_backend() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(dir.path());
    config.output.progress_backend = ProgressBackend::Sqlite;
    config.output.progress_path = dir.path().join("progress.db");

    let report = run(config, CrawlRequest::url(listing_url(&server))).await;
    assert_eq!(report.stop_reason, StopReason::Completed);

    let store = SqliteProgressStore::new(&dir.path().join("progress.db")).unwrap();
    assert_eq!(store.load_offset(&listing_key(&server)).unwrap(), 150);
    assert_eq!(
        store.load_last_listing().unwrap(),
        Some(listing_key(&server))
    );
}

#[tokio::test]
async fn test_unreadable_progress_leaves_records_untouched() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(dir.path());
    config.crawler.max_pages = Some(2);
    run(config, CrawlRequest::url(listing_url(&server))).await;
    let before = std::fs::read(records_path(&dir, &server)).unwrap();

    std::fs::write(dir.path().join("progress.json"), "{\"oops\": ").unwrap();

    let mut coordinator =
        Coordinator::new(create_test_config(dir.path())).expect("Failed to create coordinator");
    let result = coordinator
        .run(CrawlRequest::url(listing_url(&server)))
        .await;

    assert!(matches!(result, Err(HarvestError::Storage(_))));
    assert_eq!(coordinator.phase(), CrawlPhase::Abort);
    assert_eq!(std::fs::read(records_path(&dir, &server)).unwrap(), before);
    assert_eq!(requested_offsets(&server).await, vec![0, 50]);
}

#[tokio::test]
async fn test_missing_progress_resumes_after_stored_records() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(dir.path());
    config.crawler.max_pages = Some(2);
    run(config, CrawlRequest::url(listing_url(&server))).await;
    std::fs::remove_file(dir.path().join("progress.json")).unwrap();

    let report = run(
        create_test_config(dir.path()),
        CrawlRequest::url(listing_url(&server)),
    )
    .await;

    assert_eq!(report.start_offset, 100);
    assert_eq!(report.records_added, 20);
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_contiguous(&read_records(&dir, &server), TOTAL);
    assert_eq!(requested_offsets(&server).await, vec![0, 50, 100]);
}

/// Records store whose saves start failing after a number of successes
struct FailingResults {
    inner: JsonResultStore,
    saves_left: usize,
}

impl ResultStore for FailingResults {
    fn load(&self, listing_key: &str) -> StorageResult<Option<ListingResult>> {
        self.inner.load(listing_key)
    }

    fn save(&mut self, listing_key: &str, records: &[VocabularyRecord]) -> StorageResult<()> {
        if self.saves_left == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.saves_left -= 1;
        self.inner.save(listing_key, records)
    }

    fn location(&self, listing_key: &str) -> PathBuf {
        self.inner.location(listing_key)
    }

    fn quarantine(&mut self, listing_key: &str) -> StorageResult<Option<PathBuf>> {
        self.inner.quarantine(listing_key)
    }
}

#[tokio::test]
async fn test_failed_save_stops_with_prior_state_kept() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(dir.path());
    let resolver = IdentityResolver::new(&config.output.identity_pattern).unwrap();
    let results = Box::new(FailingResults {
        inner: JsonResultStore::new(dir.path(), resolver),
        saves_left: 1,
    });
    let progress = Box::new(JsonProgressStore::new(&config.output.progress_path));
    let extractor = Box::new(VocabularyListExtractor::from_config(&config.markup).unwrap());
    let mut coordinator = Coordinator::with_components(config, progress, results, extractor)
        .expect("Failed to create coordinator");

    let report = coordinator
        .run(CrawlRequest::url(listing_url(&server)))
        .await
        .expect("Crawl failed");

    assert!(matches!(
        report.stop_reason,
        StopReason::Failed { offset: 50, .. }
    ));
    assert!(report.stop_reason.is_resumable());
    assert_eq!(report.final_offset, 50);
    assert_eq!(coordinator.phase(), CrawlPhase::Done);

    let progress = JsonProgressStore::new(&dir.path().join("progress.json"));
    assert_eq!(progress.load_offset(&listing_key(&server)).unwrap(), 50);
    assert_contiguous(&read_records(&dir, &server), 50);
}
