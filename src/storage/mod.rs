//! Storage module for persisting crawl data
//!
//! This module handles everything the crawler writes to disk besides its
//! output stream:
//! - The SQLite raw-page cache (diagnostics only, never read before a fetch)
//! - Frontier checkpoints used to resume an interrupted run

pub mod checkpoint;
mod schema;
mod sqlite;
mod traits;

pub use checkpoint::CheckpointState;
pub use sqlite::SqliteCache;
pub use traits::{CacheStore, CachedPage, StorageError, StorageResult};

use std::path::Path;

/// Opens the raw-page cache at `path`
///
/// # Returns
///
/// * `Ok(SqliteCache)` - Successfully opened cache
/// * `Err(StorageError)` - Failed to open or initialize the database
pub fn open_cache(path: &Path) -> StorageResult<SqliteCache> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SqliteCache::new(path)
}
