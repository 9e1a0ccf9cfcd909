//! SQLite progress store
//!
//! Each listing is its own row, so committing one listing's offset is a
//! single-row upsert instead of a whole-document rewrite.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use crate::storage::ListingProgress;
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// `progress_meta` key of the most recently used listing
const LAST_LISTING_KEY: &str = "last_url";

/// SQLite progress backend
pub struct SqliteProgressStore {
    conn: Connection,
}

impl SqliteProgressStore {
    /// Opens (or creates) the progress database at `path`
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl ProgressStore for SqliteProgressStore {
    fn load_offset(&self, listing_key: &str) -> StorageResult<u64> {
        let offset: Option<i64> = self
            .conn
            .query_row(
                "SELECT last_offset FROM listing_progress WHERE listing_key = ?1",
                params![listing_key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(offset.and_then(|o| u64::try_from(o).ok()).unwrap_or(0))
    }

    fn save_offset(&mut self, listing_key: &str, offset: u64) -> StorageResult<()> {
        let offset = i64::try_from(offset).map_err(|_| StorageError::OffsetRange(offset))?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO listing_progress (listing_key, last_offset, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(listing_key) DO UPDATE SET
                last_offset = excluded.last_offset,
                updated_at = excluded.updated_at",
            params![listing_key, offset, now],
        )?;
        Ok(())
    }

    fn load_last_listing(&self) -> StorageResult<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM progress_meta WHERE key = ?1",
                params![LAST_LISTING_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    fn save_last_listing(&mut self, listing_key: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO progress_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![LAST_LISTING_KEY, listing_key],
        )?;
        Ok(())
    }

    fn list_progress(&self) -> StorageResult<Vec<ListingProgress>> {
        let mut stmt = self
            .conn
            .prepare("SELECT listing_key, last_offset FROM listing_progress ORDER BY listing_key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut progress = Vec::new();
        for row in rows {
            let (listing_key, offset) = row?;
            progress.push(ListingProgress {
                listing_key,
                last_offset: u64::try_from(offset).unwrap_or(0),
            });
        }

        Ok(progress)
    }
}
