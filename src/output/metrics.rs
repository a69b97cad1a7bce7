//! Crawl outcome metrics
//!
//! Counts successes and failures globally and per domain, plus a histogram
//! of failure kinds. Mutated once per processed page by the orchestrator
//! loop; read once at the end of the run.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Number of entries in the error-kind view of the summary
pub const TOP_ERROR_KINDS: usize = 10;

/// Number of entries in the domain-volume view of the summary
pub const TOP_DOMAINS: usize = 15;

#[derive(Debug, Clone, Copy, Default)]
struct DomainCounts {
    ok: u64,
    fail: u64,
}

impl DomainCounts {
    fn total(&self) -> u64 {
        self.ok + self.fail
    }
}

/// Success ratio, `0.0` when nothing was attempted
fn rate(ok: u64, fail: u64) -> f64 {
    let total = ok + fail;
    if total == 0 {
        0.0
    } else {
        ok as f64 / total as f64
    }
}

/// Accumulated crawl outcomes
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    ok: u64,
    fail: u64,
    error_kinds: HashMap<String, u64>,
    domains: HashMap<String, DomainCounts>,
}

/// Health of one domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainHealth {
    pub ok: u64,
    pub fail: u64,
    pub rate: f64,
}

/// A name with a count, used for the top-N views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub name: String,
    pub count: u64,
}

/// Report view of the metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub ok: u64,
    pub fail: u64,
    pub success_rate: f64,
    pub top_error_kinds: Vec<CountEntry>,
    pub top_domains_by_volume: Vec<CountEntry>,
    pub per_domain_health: BTreeMap<String, DomainHealth>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, domain: &str) {
        self.ok += 1;
        self.domains.entry(domain.to_string()).or_default().ok += 1;
    }

    pub fn record_failure(&mut self, domain: &str, error_kind: &str) {
        self.fail += 1;
        self.domains.entry(domain.to_string()).or_default().fail += 1;
        *self.error_kinds.entry(error_kind.to_string()).or_default() += 1;
    }

    pub fn ok(&self) -> u64 {
        self.ok
    }

    pub fn fail(&self) -> u64 {
        self.fail
    }

    /// Total outcomes recorded
    pub fn attempts(&self) -> u64 {
        self.ok + self.fail
    }

    pub fn summary(&self) -> MetricsSummary {
        let per_domain_health = self
            .domains
            .iter()
            .map(|(domain, counts)| {
                (
                    domain.clone(),
                    DomainHealth {
                        ok: counts.ok,
                        fail: counts.fail,
                        rate: rate(counts.ok, counts.fail),
                    },
                )
            })
            .collect();

        MetricsSummary {
            ok: self.ok,
            fail: self.fail,
            success_rate: rate(self.ok, self.fail),
            top_error_kinds: top_n(
                self.error_kinds.iter().map(|(k, v)| (k.as_str(), *v)),
                TOP_ERROR_KINDS,
            ),
            top_domains_by_volume: top_n(
                self.domains.iter().map(|(k, v)| (k.as_str(), v.total())),
                TOP_DOMAINS,
            ),
            per_domain_health,
        }
    }
}

/// Highest counts first, ties broken by name
fn top_n<'a>(counts: impl Iterator<Item = (&'a str, u64)>, n: usize) -> Vec<CountEntry> {
    let mut entries: Vec<CountEntry> = counts
        .map(|(name, count)| CountEntry {
            name: name.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(n);
    entries
}
