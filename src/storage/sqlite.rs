//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::CrawlSnapshot;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::PageRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// Parent directories are created when missing.
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_urls(&self, table: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT url FROM {} ORDER BY position", table))?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(urls)
    }
}

impl Storage for SqliteStorage {
    // ===== Pages =====

    fn put_page(&mut self, page: &PageRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO pages (url, domain, status_code, content_type, title, body, link_count, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(url) DO UPDATE SET
                domain = excluded.domain,
                status_code = excluded.status_code,
                content_type = excluded.content_type,
                title = excluded.title,
                body = excluded.body,
                link_count = excluded.link_count,
                fetched_at = excluded.fetched_at",
            params![
                page.url,
                page.domain,
                page.status_code,
                page.content_type,
                page.title,
                page.body,
                page.link_count as i64,
                page.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, domain, status_code, content_type, title, body, link_count, fetched_at
                 FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((url, domain, status_code, content_type, title, body, link_count, fetched_at)) = row
        else {
            return Ok(None);
        };

        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| StorageError::InvalidRecord(format!("fetched_at for {}: {}", url, e)))?
            .with_timezone(&Utc);

        Ok(Some(PageRecord {
            url,
            domain,
            status_code,
            content_type,
            title,
            body,
            link_count: usize::try_from(link_count).unwrap_or_default(),
            fetched_at,
        }))
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_pages_by_domain(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, COUNT(*) AS n FROM pages GROUP BY domain ORDER BY n DESC, domain ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Frontier Snapshot =====

    fn save_snapshot(&mut self, snapshot: &CrawlSnapshot) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM frontier", [])?;
        tx.execute("DELETE FROM visited", [])?;
        {
            let mut insert = tx.prepare("INSERT INTO frontier (position, url) VALUES (?1, ?2)")?;
            for (position, url) in snapshot.frontier.iter().enumerate() {
                insert.execute(params![position as i64, url])?;
            }

            let mut insert =
                tx.prepare("INSERT OR IGNORE INTO visited (position, url) VALUES (?1, ?2)")?;
            for (position, url) in snapshot.visited.iter().enumerate() {
                insert.execute(params![position as i64, url])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_snapshot(&self) -> StorageResult<CrawlSnapshot> {
        Ok(CrawlSnapshot {
            frontier: self.load_urls("frontier")?,
            visited: self.load_urls("visited")?,
        })
    }

    fn clear_snapshot(&mut self) -> StorageResult<()> {
        self.conn
            .execute_batch("DELETE FROM frontier; DELETE FROM visited;")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn page(url: &str, domain: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            domain: domain.to_string(),
            status_code: 200,
            content_type: Some("text/html".to_string()),
            title: Some("Title".to_string()),
            body: "<html></html>".to_string(),
            link_count: 3,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_put_and_get_page() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let record = page("https://example.com/", "example.com");
        storage.put_page(&record).unwrap();

        let loaded = storage.get_page("https://example.com/").unwrap().unwrap();
        assert_eq!(loaded.url, record.url);
        assert_eq!(loaded.status_code, 200);
        assert_eq!(loaded.link_count, 3);
        assert_eq!(loaded.fetched_at.timestamp(), record.fetched_at.timestamp());

        assert!(storage.get_page("https://example.com/missing").unwrap().is_none());
    }

    #[test]
    fn test_put_page_replaces_existing() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.put_page(&page("https://example.com/", "example.com")).unwrap();

        let mut updated = page("https://example.com/", "example.com");
        updated.title = Some("New".to_string());
        updated.status_code = 301;
        storage.put_page(&updated).unwrap();

        assert_eq!(storage.count_pages().unwrap(), 1);
        let loaded = storage.get_page("https://example.com/").unwrap().unwrap();
        assert_eq!(loaded.title.as_deref(), Some("New"));
        assert_eq!(loaded.status_code, 301);
    }

    #[test]
    fn test_count_pages_by_domain() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.put_page(&page("https://a.com/1", "a.com")).unwrap();
        storage.put_page(&page("https://b.com/1", "b.com")).unwrap();
        storage.put_page(&page("https://b.com/2", "b.com")).unwrap();

        assert_eq!(
            storage.count_pages_by_domain().unwrap(),
            vec![("b.com".to_string(), 2), ("a.com".to_string(), 1)]
        );
    }

    #[test]
    fn test_snapshot_round_trip_replaces_previous() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.load_snapshot().unwrap(), CrawlSnapshot::default());

        storage
            .save_snapshot(&CrawlSnapshot {
                frontier: vec!["https://a.com/old".to_string()],
                visited: vec!["https://a.com/".to_string()],
            })
            .unwrap();

        let snapshot = CrawlSnapshot {
            frontier: vec!["https://a.com/2".to_string(), "https://a.com/1".to_string()],
            visited: vec!["https://a.com/".to_string(), "https://a.com/3".to_string()],
        };
        storage.save_snapshot(&snapshot).unwrap();
        assert_eq!(storage.load_snapshot().unwrap(), snapshot);

        storage.clear_snapshot().unwrap();
        assert_eq!(storage.load_snapshot().unwrap(), CrawlSnapshot::default());
    }

    #[test]
    fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("crawl.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.put_page(&page("https://a.com/", "a.com")).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_pages().unwrap(), 1);
    }
}
