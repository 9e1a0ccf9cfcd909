//! Database schema for the SQLite progress backend

/// SQL schema for the progress database
pub const SCHEMA_SQL: &str = r#"
-- Committed pagination offset per listing
CREATE TABLE IF NOT EXISTS listing_progress (
    listing_key TEXT PRIMARY KEY,
    last_offset INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Single-value settings such as the most recently used listing
CREATE TABLE IF NOT EXISTS progress_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
