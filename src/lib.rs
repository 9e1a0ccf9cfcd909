//! Kotoba-Harvest: a resumable vocabulary list harvester
//!
//! This crate walks a paginated vocabulary listing one page at a time,
//! extracts word entries from each page, and persists both the accumulated
//! records and the pagination offset after every page so an interrupted
//! crawl resumes exactly where it stopped. The harvested records can then be
//! turned into a flashcard deck.

pub mod config;
pub mod crawler;
pub mod listing;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Kotoba-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No listing URL provided")]
    NoListing,

    #[error("Invalid listing URL '{url}': {message}")]
    InvalidListing { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Kotoba-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport, CrawlRequest, ListingSource};
pub use state::{CrawlPhase, StopReason};
pub use storage::{ListingProgress, ListingResult, VocabularyRecord};
