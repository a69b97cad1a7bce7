//! Output sink traits and types
//!
//! This module defines the trait interface for record sinks and the record
//! written for every successfully extracted page.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One extracted page, as written to the output stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    /// URL taken from the frontier
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    pub status: u16,

    pub title: String,

    pub text: String,

    /// Outbound links found on the page, before dedup against the seen set
    pub links: Vec<String>,

    /// Name of the extractor that produced the record
    pub extractor: String,

    pub fetched_at: DateTime<Utc>,
}

/// Destination for extracted page records
pub trait RecordSink: Send {
    /// Writes one record
    fn write(&mut self, record: &OutputRecord) -> OutputResult<()>;

    /// Flushes buffered records to durable storage
    fn flush(&mut self) -> OutputResult<()>;

    /// Number of records written through this sink
    fn written(&self) -> u64;
}
