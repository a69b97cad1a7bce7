//! Final crawl report
//!
//! Written once at the end of every run, including cancelled and failed
//! ones, as a single pretty-printed JSON object.

use crate::output::metrics::MetricsSummary;
use crate::output::traits::OutputResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Metrics summary plus run bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    #[serde(flatten)]
    pub summary: MetricsSummary,

    /// Pages counted against the budget (successes and failures)
    pub pages_processed: usize,

    /// URLs skipped because robots.txt disallowed them
    pub robots_skipped: usize,

    /// URLs still queued when the run ended
    pub frontier_remaining: usize,

    /// Size of the seen set when the run ended
    pub seen_total: usize,

    /// Whether the run was stopped by cancellation
    pub cancelled: bool,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Writes the report as JSON, creating parent directories as needed
pub fn write_report(path: &Path, report: &CrawlReport) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    let summary = &report.summary;

    println!("=== Crawl Report ===\n");

    println!("Overview:");
    println!("  Pages processed: {}", report.pages_processed);
    println!("  Robots skipped: {}", report.robots_skipped);
    println!("  Frontier remaining: {}", report.frontier_remaining);
    println!("  URLs seen: {}", report.seen_total);
    println!("  Duration: {:.1}s", report.duration_seconds());
    if report.cancelled {
        println!("  Stopped early: cancelled");
    }
    println!();

    if !summary.top_error_kinds.is_empty() {
        println!("Error Summary:");
        for entry in &summary.top_error_kinds {
            println!("  {}: {}", entry.name, entry.count);
        }
        println!();
    }

    if !summary.top_domains_by_volume.is_empty() {
        println!("Top Domains:");
        for entry in &summary.top_domains_by_volume {
            let rate = summary
                .per_domain_health
                .get(&entry.name)
                .map(|h| h.rate * 100.0)
                .unwrap_or(0.0);
            println!("  {}: {} pages ({:.1}% ok)", entry.name, entry.count, rate);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        summary.success_rate * 100.0,
        summary.ok,
        summary.ok + summary.fail
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Metrics;
    use tempfile::TempDir;

    fn report() -> CrawlReport {
        let mut metrics = Metrics::new();
        metrics.record_success("example.com");
        metrics.record_failure("example.com", "not_found");
        let now = Utc::now();
        CrawlReport {
            summary: metrics.summary(),
            pages_processed: 2,
            robots_skipped: 1,
            frontier_remaining: 4,
            seen_total: 7,
            cancelled: false,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_report_is_flat_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("report.json");

        write_report(&path, &report()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["ok"], 1);
        assert_eq!(value["fail"], 1);
        assert_eq!(value["success_rate"], 0.5);
        assert_eq!(value["top_error_kinds"][0]["name"], "not_found");
        assert_eq!(value["per_domain_health"]["example.com"]["rate"], 0.5);
        assert_eq!(value["robots_skipped"], 1);
        assert_eq!(value["cancelled"], false);
    }

    #[test]
    fn test_write_report_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");

        write_report(&path, &report()).unwrap();
        let mut second = report();
        second.pages_processed = 9;
        write_report(&path, &second).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["pages_processed"], 9);
    }
}
