//! JSON document progress store
//!
//! The document maps each listing key to `{"last_offset": N}` and keeps the
//! most recently used listing under the reserved `last_url` key:
//!
//! ```json
//! {
//!     "https://jpdb.io/novel/5829/kino-no-tabi/vocabulary-list": { "last_offset": 150 },
//!     "last_url": "https://jpdb.io/novel/5829/kino-no-tabi/vocabulary-list"
//! }
//! ```
//!
//! Every update reads the whole document, changes one key and writes the
//! whole document back, so unrelated keys (and unknown fields inside a
//! listing entry) survive untouched.

use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use crate::storage::{to_json_pretty, write_atomic, ListingProgress};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Reserved key holding the most recently used listing
const LAST_LISTING_KEY: &str = "last_url";

/// Field inside a listing entry holding the committed offset
const OFFSET_FIELD: &str = "last_offset";

/// Progress store backed by a single shared JSON document
pub struct JsonProgressStore {
    path: PathBuf,
}

impl JsonProgressStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full document; a missing or blank file is an empty document
    fn read_document(&self) -> StorageResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageError::Corrupt {
                path: self.path.display().to_string(),
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> StorageResult<()> {
        let bytes = to_json_pretty(document)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn load_offset(&self, listing_key: &str) -> StorageResult<u64> {
        let document = self.read_document()?;
        Ok(document
            .get(listing_key)
            .and_then(|entry| entry.get(OFFSET_FIELD))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    fn save_offset(&mut self, listing_key: &str, offset: u64) -> StorageResult<()> {
        let mut document = self.read_document()?;

        match document.get_mut(listing_key) {
            Some(Value::Object(entry)) => {
                entry.insert(OFFSET_FIELD.to_string(), Value::from(offset));
            }
            _ => {
                let mut entry = Map::new();
                entry.insert(OFFSET_FIELD.to_string(), Value::from(offset));
                document.insert(listing_key.to_string(), Value::Object(entry));
            }
        }

        self.write_document(&document)
    }

    fn load_last_listing(&self) -> StorageResult<Option<String>> {
        let document = self.read_document()?;
        Ok(document
            .get(LAST_LISTING_KEY)
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .map(str::to_string))
    }

    fn save_last_listing(&mut self, listing_key: &str) -> StorageResult<()> {
        let mut document = self.read_document()?;
        document.insert(
            LAST_LISTING_KEY.to_string(),
            Value::String(listing_key.to_string()),
        );
        self.write_document(&document)
    }

    fn list_progress(&self) -> StorageResult<Vec<ListingProgress>> {
        let document = self.read_document()?;
        let mut progress: Vec<ListingProgress> = document
            .iter()
            .filter(|(key, _)| key.as_str() != LAST_LISTING_KEY)
            .filter_map(|(key, entry)| {
                entry
                    .get(OFFSET_FIELD)
                    .and_then(Value::as_u64)
                    .map(|last_offset| ListingProgress {
                        listing_key: key.clone(),
                        last_offset,
                    })
            })
            .collect();
        progress.sort_by(|a, b| a.listing_key.cmp(&b.listing_key));
        Ok(progress)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
