//! Storage traits and error types
//!
//! This module defines the trait interface for raw-page cache backends and
//! the error type shared by the cache and the checkpoint store.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid timestamp in cache row: {0}")]
    InvalidTimestamp(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A fetched page as kept in the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    /// URL that was requested; the cache key
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    pub fetched_at: DateTime<Utc>,

    pub status_code: u16,

    /// Raw response body
    pub body: String,
}

/// Trait for raw-page cache backends
///
/// The cache is written after every fetch that produced a response and is
/// never consulted before fetching; it exists for inspection and replay.
pub trait CacheStore: Send {
    /// Stores a page, replacing any previous entry for the same URL
    fn put(&mut self, page: &CachedPage) -> StorageResult<()>;

    /// Gets the latest entry for a URL
    fn get(&self, url: &str) -> StorageResult<Option<CachedPage>>;

    /// Number of cached URLs
    fn count(&self) -> StorageResult<u64>;
}
