//! Output module for crawl records and reports
//!
//! This module handles:
//! - Appending one JSON record per extracted page
//! - Recording success/failure metrics per domain
//! - Writing and printing the final crawl report

mod jsonl;
pub mod metrics;
mod report;
mod traits;

pub use jsonl::JsonlSink;
pub use metrics::{CountEntry, DomainHealth, Metrics, MetricsSummary};
pub use report::{print_report, write_report, CrawlReport};
pub use traits::{OutputError, OutputRecord, OutputResult, RecordSink};
