//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the binary, including:
//! - SQLite database initialization and schema management
//! - Page persistence
//! - Frontier and visited-set snapshots for resumption

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::CrawledPage;
use crate::url::host_key;
use chrono::{DateTime, Utc};

/// Represents a page in the database
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub url: String,
    pub domain: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub body: String,
    pub link_count: usize,
    pub fetched_at: DateTime<Utc>,
}

impl PageRecord {
    /// Builds a record from a crawled page, stamped with the current time
    pub fn from_crawled(page: &CrawledPage) -> Self {
        let domain = url::Url::parse(&page.url)
            .ok()
            .as_ref()
            .and_then(host_key)
            .unwrap_or_default();

        Self {
            url: page.url.clone(),
            domain,
            status_code: page.status,
            content_type: page.content_type().map(str::to_string),
            title: page.title.clone(),
            body: page.body.clone(),
            link_count: page.links.len(),
            fetched_at: Utc::now(),
        }
    }
}
