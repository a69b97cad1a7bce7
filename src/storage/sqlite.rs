//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CacheStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CacheStore, CachedPage, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite raw-page cache
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Opens or creates the cache database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
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

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl CacheStore for SqliteCache {
    fn put(&mut self, page: &CachedPage) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO pages (url, final_url, fetched_at, status_code, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                page.url,
                page.final_url,
                page.fetched_at.to_rfc3339(),
                page.status_code,
                page.body
            ],
        )?;
        Ok(())
    }

    fn get(&self, url: &str) -> StorageResult<Option<CachedPage>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, final_url, fetched_at, status_code, body FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u16>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((url, final_url, fetched_at, status_code, body)) = row else {
            return Ok(None);
        };

        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|_| StorageError::InvalidTimestamp(fetched_at.clone()))?
            .with_timezone(&Utc);

        Ok(Some(CachedPage {
            url,
            final_url,
            fetched_at,
            status_code,
            body,
        }))
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn page(url: &str, status_code: u16, body: &str) -> CachedPage {
        CachedPage {
            url: url.to_string(),
            final_url: url.to_string(),
            fetched_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            status_code,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        let cache = SqliteCache::new_in_memory().unwrap();
        assert_eq!(cache.count().unwrap(), 0);
    }

    #[test]
    fn test_put_and_get() {
        let mut cache = SqliteCache::new_in_memory().unwrap();
        cache.put(&page("https://example.com/", 200, "<html></html>")).unwrap();

        let stored = cache.get("https://example.com/").unwrap().unwrap();
        assert_eq!(stored, page("https://example.com/", 200, "<html></html>"));
        assert!(cache.get("https://example.com/other").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_existing() {
        let mut cache = SqliteCache::new_in_memory().unwrap();
        cache.put(&page("https://example.com/", 503, "down")).unwrap();
        cache.put(&page("https://example.com/", 200, "up")).unwrap();

        assert_eq!(cache.count().unwrap(), 1);
        let stored = cache.get("https://example.com/").unwrap().unwrap();
        assert_eq!(stored.status_code, 200);
        assert_eq!(stored.body, "up");
    }

    #[test]
    fn test_file_backed_cache_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");

        {
            let mut cache = SqliteCache::new(&path).unwrap();
            cache.put(&page("https://a.example/", 200, "a")).unwrap();
            cache.put(&page("https://b.example/", 404, "b")).unwrap();
        }

        let cache = SqliteCache::new(&path).unwrap();
        assert_eq!(cache.count().unwrap(), 2);
        assert_eq!(cache.get("https://b.example/").unwrap().unwrap().status_code, 404);
    }
}
