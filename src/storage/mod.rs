//! Storage module for persisting crawl data
//!
//! This module handles everything the harvester keeps on disk:
//! - The vocabulary record model and its file format
//! - The shared progress document (JSON document or SQLite database)
//! - One records file per listing, rewritten in full after every page
//!
//! Every write replaces its target atomically (temporary sibling + rename) so
//! a killed process never leaves a half-written document behind.

mod json_progress;
mod json_results;
mod schema;
mod sqlite_progress;
mod traits;

pub use json_progress::JsonProgressStore;
pub use json_results::JsonResultStore;
pub use sqlite_progress::SqliteProgressStore;
pub use traits::{ProgressStore, ResultStore, StorageError, StorageResult};

use crate::config::{OutputConfig, ProgressBackend};
use crate::listing::IdentityResolver;
use crate::HarvestError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// One vocabulary entry harvested from a listing page
///
/// Field names on disk follow the records file format consumed by deck
/// assembly (`id`, `word`, `reading`, `meanings`, `top`). Every field except
/// the id defaults to empty when missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyRecord {
    /// `offset + position` (1-based) of the entry within the listing
    #[serde(rename = "id")]
    pub sequence_id: u64,

    /// Surface form
    #[serde(default)]
    pub word: String,

    /// Reading reconstructed from ruby annotations
    #[serde(default)]
    pub reading: String,

    /// Glosses in listing order
    #[serde(default)]
    pub meanings: Vec<String>,

    /// Lower-cased category -> raw frequency value
    #[serde(rename = "top", default)]
    pub frequency_tags: BTreeMap<String, String>,
}

/// The committed pagination offset of one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingProgress {
    pub listing_key: String,
    pub last_offset: u64,
}

/// All records harvested so far for one listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingResult {
    pub listing_key: String,
    pub entries: Vec<VocabularyRecord>,
}

/// Opens the progress store selected by the output configuration
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(Box<dyn ProgressStore>)` - JSON document or SQLite backed store
/// * `Err(HarvestError)` - The SQLite database could not be opened
pub fn open_progress_store(config: &OutputConfig) -> Result<Box<dyn ProgressStore>, HarvestError> {
    match config.progress_backend {
        ProgressBackend::Json => Ok(Box::new(JsonProgressStore::new(&config.progress_path))),
        ProgressBackend::Sqlite => Ok(Box::new(SqliteProgressStore::new(&config.progress_path)?)),
    }
}

/// Opens the per-listing records store described by the output configuration
pub fn open_result_store(config: &OutputConfig) -> Result<JsonResultStore, HarvestError> {
    let resolver = IdentityResolver::new(&config.identity_pattern)?;
    Ok(JsonResultStore::new(&config.records_dir, resolver))
}

/// Serializes with 4-space indentation, leaving non-ASCII text unescaped
pub(crate) fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Replaces `path` with `contents` via a synced temporary sibling and rename
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)
}
