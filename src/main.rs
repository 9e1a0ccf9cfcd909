//! Kotoba-Harvest main entry point
//!
//! This is the command-line interface for the vocabulary list harvester.

use clap::Parser;
use kotoba_harvest::config::{load_config_with_hash, Config};
use kotoba_harvest::crawler::{crawl, CrawlReport, CrawlRequest, ListingSource};
use kotoba_harvest::output::{build_deck, load_status, print_status};
use kotoba_harvest::storage::open_progress_store;
use kotoba_harvest::HarvestError;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Kotoba-Harvest: a resumable vocabulary list harvester
///
/// Kotoba-Harvest pages through a vocabulary listing, saving the harvested
/// entries and the pagination offset after every page so an interrupted
/// crawl picks up where it stopped. Harvested entries can be turned into a
/// flashcard deck.
#[derive(Parser, Debug)]
#[command(name = "kotoba-harvest")]
#[command(version)]
#[command(about = "A resumable vocabulary list harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults if omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Listing URL to harvest
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Continue the most recently harvested listing
    #[arg(long, conflicts_with = "url")]
    resume: bool,

    /// Start from the first page, ignoring stored progress
    #[arg(long)]
    fresh: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show stored progress of every listing and exit
    #[arg(long, conflicts_with_all = ["deck", "url", "resume", "fresh"])]
    status: bool,

    /// Build a flashcard deck from a records file and exit
    #[arg(long, value_name = "RECORDS_JSON", conflicts_with_all = ["url", "resume", "fresh"])]
    deck: Option<PathBuf>,

    /// Where to write the deck (defaults to the records file with a .txt extension)
    #[arg(long, value_name = "FILE", requires = "deck")]
    deck_output: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Handle modes that need no configuration
    if let Some(input) = &cli.deck {
        return handle_deck(input, cli.deck_output.as_deref());
    }

    let config = load(cli.config.as_deref())?;

    if cli.status {
        handle_status(&config)
    } else {
        let source = listing_source(cli.url, cli.resume)?;
        handle_crawl(
            config,
            CrawlRequest {
                source,
                fresh: cli.fresh,
            },
        )
        .await
    }
}

/// Picks the listing to crawl from `--url` / `--resume`
fn listing_source(url: Option<String>, resume: bool) -> Result<ListingSource, HarvestError> {
    match url {
        Some(url) => Ok(ListingSource::Url(url)),
        None if resume => Ok(ListingSource::ResumeLast),
        None => {
            tracing::error!("Pass --url URL, or --resume to continue the last listing");
            Err(HarvestError::NoListing)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kotoba_harvest=info,warn"),
            1 => EnvFilter::new("kotoba_harvest=debug,info"),
            2 => EnvFilter::new("kotoba_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given; using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the --status mode: shows every stored listing
fn handle_status(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Progress: {}\n", config.output.progress_path.display());

    let store = open_progress_store(&config.output)?;
    let status = load_status(store.as_ref())?;
    print_status(&status);

    Ok(())
}

/// Handles the --deck mode: builds a deck from a records file
fn handle_deck(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match build_deck(input, output) {
        Ok(summary) => {
            println!(
                "✓ Deck '{}' ({} cards) saved to: {}",
                summary.deck_name,
                summary.cards,
                summary.output_path.display()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to build deck from {}: {}", input.display(), e);
            Err(e.into())
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    request: CrawlRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    if request.fresh {
        tracing::info!("Starting fresh crawl (ignoring previous progress)");
    } else {
        tracing::info!("Starting crawl (will resume if progress exists)");
    }

    match crawl(config, request).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_report(report: &CrawlReport) {
    println!("\n=== Crawl Report ===");
    println!("Listing: {}", report.listing_key);
    println!("Records: {}", report.records_path.display());
    println!(
        "Offset: {} -> {} (listing reports {} entries)",
        report.start_offset, report.final_offset, report.total_entries
    );
    println!(
        "Pages fetched: {}, new entries: {}, total entries: {}",
        report.pages_fetched, report.records_added, report.total_records
    );
    println!("Stopped: {}", report.stop_reason);
    if report.stop_reason.is_resumable() {
        println!("Run again to resume from offset {}.", report.final_offset);
    }
}
