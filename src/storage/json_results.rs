//! Per-listing records files
//!
//! Each listing's records live in `<records-dir>/<stem>.json` as a pretty
//! printed JSON array. The whole array is rewritten after every page; the
//! rewrite goes through a temporary file and a rename, so the file on disk
//! is always either the previous page's snapshot or the current one.

use crate::listing::IdentityResolver;
use crate::storage::traits::{ResultStore, StorageResult};
use crate::storage::{to_json_pretty, write_atomic, ListingResult, VocabularyRecord};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Records store writing one JSON file per listing
pub struct JsonResultStore {
    dir: PathBuf,
    resolver: IdentityResolver,
}

impl JsonResultStore {
    pub fn new(dir: &Path, resolver: IdentityResolver) -> Self {
        Self {
            dir: dir.to_path_buf(),
            resolver,
        }
    }
}

impl ResultStore for JsonResultStore {
    fn load(&self, listing_key: &str) -> StorageResult<Option<ListingResult>> {
        let path = self.location(listing_key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let entries: Vec<VocabularyRecord> = serde_json::from_str(&content)?;

        Ok(Some(ListingResult {
            listing_key: listing_key.to_string(),
            entries,
        }))
    }

    fn save(&mut self, listing_key: &str, records: &[VocabularyRecord]) -> StorageResult<()> {
        let bytes = to_json_pretty(&records)?;
        write_atomic(&self.location(listing_key), &bytes)?;
        Ok(())
    }

    fn location(&self, listing_key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", self.resolver.stem_for(listing_key)))
    }

    fn quarantine(&mut self, listing_key: &str) -> StorageResult<Option<PathBuf>> {
        let path = self.location(listing_key);
        if !path.exists() {
            return Ok(None);
        }

        let stamp = Local::now().format("%Y_%m_%d_%H_%M_%S");
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", stamp));
        let target = path.with_file_name(name);

        fs::rename(&path, &target)?;
        Ok(Some(target))
    }
}
