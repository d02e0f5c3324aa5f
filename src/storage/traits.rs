//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::CrawlSnapshot;
use crate::storage::PageRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawl engine never calls a storage backend itself. The binary wires
/// one to the engine's events: pages are stored from `after-crawl`, and the
/// frontier snapshot is saved on `stop` and `finish`.
pub trait Storage {
    // ===== Pages =====

    /// Inserts or replaces the stored copy of a page
    fn put_page(&mut self, page: &PageRecord) -> StorageResult<()>;

    /// Gets a page by URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Counts stored pages
    fn count_pages(&self) -> StorageResult<u64>;

    /// Counts stored pages per domain, largest first
    fn count_pages_by_domain(&self) -> StorageResult<Vec<(String, u64)>>;

    // ===== Frontier Snapshot =====

    /// Replaces the saved frontier and visited set
    fn save_snapshot(&mut self, snapshot: &CrawlSnapshot) -> StorageResult<()>;

    /// Loads the saved frontier and visited set (empty if none was saved)
    fn load_snapshot(&self) -> StorageResult<CrawlSnapshot>;

    /// Deletes the saved frontier and visited set
    fn clear_snapshot(&mut self) -> StorageResult<()>;
}
