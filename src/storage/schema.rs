//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Driftnet database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Pages delivered on the after-crawl channel
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    domain TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    content_type TEXT,
    title TEXT,
    body TEXT NOT NULL,
    link_count INTEGER NOT NULL DEFAULT 0,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_domain ON pages(domain);

-- Pending URLs, in dequeue order
CREATE TABLE IF NOT EXISTS frontier (
    position INTEGER PRIMARY KEY,
    url TEXT NOT NULL
);

-- URLs already dequeued, in visit order
CREATE TABLE IF NOT EXISTS visited (
    position INTEGER PRIMARY KEY,
    url TEXT NOT NULL UNIQUE
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
