//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Error classification for failed fetches
//! - Retry with exponential backoff
//! - Rate-limited HTTP fetching
//! - Overall crawl orchestration

pub mod classify;
mod coordinator;
mod fetcher;
pub mod retry;

pub use classify::{classify_exception, classify_fetch_error, classify_status, ErrorKind};
pub use coordinator::{run_crawl, Orchestrator, PageOutcome};
pub use fetcher::{build_http_client, FetchResult, Fetcher, ResponseMetadata};
pub use retry::{run_with_retry, RetryPolicy};
