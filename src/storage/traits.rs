//! Storage traits and error types
//!
//! This module defines the trait interface for the progress and records
//! stores and the associated error types.

use crate::storage::{ListingProgress, ListingResult, VocabularyRecord};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt document {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Offset out of range: {0}")]
    OffsetRange(u64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable mapping from listing key to committed offset
///
/// Implementations must leave every other listing's entry untouched when
/// one listing is updated. Access is assumed to be single-process and
/// sequential.
pub trait ProgressStore {
    /// Returns the committed offset for a listing, 0 if unknown
    fn load_offset(&self, listing_key: &str) -> StorageResult<u64>;

    /// Commits `offset` for a listing
    fn save_offset(&mut self, listing_key: &str, offset: u64) -> StorageResult<()>;

    /// Returns the most recently used listing key, if any
    fn load_last_listing(&self) -> StorageResult<Option<String>>;

    /// Records the most recently used listing key
    fn save_last_listing(&mut self, listing_key: &str) -> StorageResult<()>;

    /// Returns every listing with a committed offset, sorted by key
    fn list_progress(&self) -> StorageResult<Vec<ListingProgress>>;
}

/// Durable per-listing record sequence, rewritten in full on every save
pub trait ResultStore {
    /// Loads the stored records for a listing
    ///
    /// Returns `Ok(None)` when nothing has been stored for the listing yet.
    fn load(&self, listing_key: &str) -> StorageResult<Option<ListingResult>>;

    /// Replaces the stored records for a listing with `records`
    fn save(&mut self, listing_key: &str, records: &[VocabularyRecord]) -> StorageResult<()>;

    /// Where the records of a listing live
    fn location(&self, listing_key: &str) -> PathBuf;

    /// Moves an unreadable records file aside so a fresh harvest can
    /// replace it; returns the new location if anything was moved
    fn quarantine(&mut self, listing_key: &str) -> StorageResult<Option<PathBuf>>;
}
