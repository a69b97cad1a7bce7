//! Crawl orchestration
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Restoring or seeding the frontier
//! - Dispatching concurrent fetch + extract batches
//! - Classifying outcomes into metrics
//! - Enqueueing newly discovered links
//! - Periodic and final checkpoints, and the final report
//!
//! The frontier, seen set and metrics are owned by the loop and only touched
//! between batches; fetch tasks never mutate them.

use crate::config::{validate, Config};
use crate::crawler::classify::{classify_fetch_error, classify_status, ErrorKind};
use crate::crawler::fetcher::{build_http_client, FetchResult, Fetcher};
use crate::output::{write_report, CrawlReport, JsonlSink, Metrics, OutputRecord, RecordSink};
use crate::plugins::{ExtractionRecord, PluginManager};
use crate::robots::RobotsChecker;
use crate::search::build_multi_query_urls;
use crate::state::CrawlPhase;
use crate::storage::{checkpoint, open_cache, CacheStore, CachedPage};
use crate::url::{canonicalize, host_of};
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of processing one frontier URL
#[derive(Debug)]
pub enum PageOutcome {
    /// robots.txt disallows the URL; not counted against the budget
    Disallowed,

    /// A response was received; `extraction` is set for non-error statuses
    Fetched {
        fetch: FetchResult,
        extraction: Option<(String, ExtractionRecord)>,
        fetched_at: DateTime<Utc>,
    },

    /// Every attempt failed without a response
    Failed { kind: ErrorKind, error: String },
}

/// Borrowed view of everything a fetch task needs
struct PageContext<'a> {
    fetcher: &'a Fetcher,
    robots: Option<&'a RobotsChecker>,
    plugins: &'a PluginManager,
    robots_token: &'a str,
}

/// Robots check, fetch and (for non-error responses) extraction of one URL
async fn process_one(ctx: &PageContext<'_>, url: &str) -> PageOutcome {
    if let Some(robots) = ctx.robots {
        if let Ok(parsed) = Url::parse(url) {
            if !robots.allowed(&parsed, ctx.robots_token).await {
                return PageOutcome::Disallowed;
            }
        }
    }

    let fetch = match ctx.fetcher.fetch(url).await {
        Ok(fetch) => fetch,
        Err(e) => {
            return PageOutcome::Failed {
                kind: classify_fetch_error(&e),
                error: e.to_string(),
            }
        }
    };
    let fetched_at = Utc::now();

    let extraction = if fetch.is_error_status() {
        None
    } else {
        // Relative links resolve against the post-redirect location
        Url::parse(&fetch.final_url)
            .or_else(|_| Url::parse(url))
            .ok()
            .map(|base| ctx.plugins.extract(&base, &fetch.body))
    };

    PageOutcome::Fetched {
        fetch,
        extraction,
        fetched_at,
    }
}

/// Main crawler orchestrator
pub struct Orchestrator {
    config: Config,
    link_limit: usize,
    fetcher: Fetcher,
    robots: Option<RobotsChecker>,
    plugins: PluginManager,
    cache: Option<Box<dyn CacheStore>>,
    sink: Box<dyn RecordSink>,
    metrics: Metrics,
    frontier: VecDeque<String>,
    seen: HashSet<String>,
    processed: HashSet<String>,
    phase: CrawlPhase,
    pages_processed: usize,
    robots_skipped: usize,
    since_checkpoint: usize,
}

impl Orchestrator {
    /// Creates an orchestrator writing records to the configured output file
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Frontier restored or seeded, ready to run
    /// * `Err(HarvestError)` - Invalid configuration, unopenable output
    ///   file, or HTTP client construction failure
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        let sink = JsonlSink::open(&config.output.output_path)?;
        Self::with_sink(config, Box::new(sink))
    }

    /// Creates an orchestrator writing records to `sink`
    pub fn with_sink(mut config: Config, sink: Box<dyn RecordSink>) -> Result<Self> {
        validate(&config)?;
        let link_limit = config.apply_mode_policy();

        let client = build_http_client(
            &config.user_agent,
            config.crawler.request_timeout(),
            config.crawler.verify_ssl,
        )?;
        let fetcher = Fetcher::new(
            client.clone(),
            config.crawler.concurrency,
            config.crawler.per_domain_delay(),
        );
        let robots = config
            .crawler
            .respect_robots
            .then(|| RobotsChecker::new(client));
        let plugins = PluginManager::load(config.output.plugin_dir.as_deref());

        let cache: Option<Box<dyn CacheStore>> = match &config.output.cache_path {
            Some(path) => match open_cache(path) {
                Ok(cache) => Some(Box::new(cache)),
                Err(e) => {
                    tracing::warn!("Page cache {} disabled: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        let mut orchestrator = Self {
            config,
            link_limit,
            fetcher,
            robots,
            plugins,
            cache,
            sink,
            metrics: Metrics::new(),
            frontier: VecDeque::new(),
            seen: HashSet::new(),
            processed: HashSet::new(),
            phase: CrawlPhase::Init,
            pages_processed: 0,
            robots_skipped: 0,
            since_checkpoint: 0,
        };
        orchestrator.restore_or_seed();
        Ok(orchestrator)
    }

    /// Current crawl phase
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Number of URLs waiting in the frontier
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Number of canonical keys seen so far
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Per-page link limit in effect for this run
    pub fn link_limit(&self) -> usize {
        self.link_limit
    }

    fn restore_or_seed(&mut self) {
        if self.config.crawler.resume {
            if let Some(path) = &self.config.output.checkpoint_path {
                if let Some((frontier, seen)) = checkpoint::load(path) {
                    tracing::info!(
                        "Resuming from checkpoint {}: {} queued, {} seen",
                        path.display(),
                        frontier.len(),
                        seen.len()
                    );
                    self.frontier = frontier;
                    self.seen = seen;
                    return;
                }
                tracing::info!("No usable checkpoint at {}, starting fresh", path.display());
            } else {
                tracing::warn!("Resume requested but no checkpoint path configured");
            }
        }

        let search_urls = build_multi_query_urls(&self.config.queries);
        let seeds: Vec<String> = self
            .config
            .seeds
            .iter()
            .cloned()
            .chain(search_urls)
            .collect();

        let added = seeds.iter().filter(|seed| self.enqueue(seed)).count();
        tracing::info!("Seeded frontier with {} URLs", added);
    }

    /// Canonicalizes `raw` and queues it unless its key was already seen
    fn enqueue(&mut self, raw: &str) -> bool {
        let key = canonicalize(raw);
        if key.is_empty() {
            tracing::debug!("Not enqueueing uncrawlable URL {}", raw);
            return false;
        }
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.frontier.push_back(key);
        true
    }

    fn transition(&mut self, to: CrawlPhase) -> Result<()> {
        if !self.phase.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!("Crawl phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Runs the crawl until the budget or frontier is exhausted, or `cancel`
    /// fires
    ///
    /// The final checkpoint and the report are written however the loop
    /// ends. A batch already dispatched always completes.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<CrawlReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.transition(CrawlPhase::Running)?;
        tracing::info!(
            "Starting crawl: {} queued, max {} pages, concurrency {}, mode {}",
            self.frontier.len(),
            self.config.crawler.max_pages,
            self.config.crawler.concurrency,
            self.config.crawler.mode
        );

        let loop_result = self.crawl_loop(&cancel, start).await;
        let cancelled = cancel.is_cancelled();

        if let Err(e) = &loop_result {
            tracing::error!("Crawl loop stopped: {}", e);
        }

        let finish = self.finish(started_at, cancelled);
        loop_result?;
        let report = finish?;

        tracing::info!(
            "Crawl completed: {} pages processed ({} ok, {} failed) in {:?}",
            report.pages_processed,
            report.summary.ok,
            report.summary.fail,
            start.elapsed()
        );
        Ok(report)
    }

    async fn crawl_loop(&mut self, cancel: &CancellationToken, start: Instant) -> Result<()> {
        let max_pages = self.config.crawler.max_pages;

        while self.pages_processed < max_pages && !self.frontier.is_empty() {
            if cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping before next batch");
                break;
            }

            let budget = max_pages - self.pages_processed;
            let batch = self.next_batch(self.config.crawler.concurrency.min(budget));
            if batch.is_empty() {
                continue;
            }

            let outcomes = {
                let ctx = PageContext {
                    fetcher: &self.fetcher,
                    robots: self.robots.as_ref(),
                    plugins: &self.plugins,
                    robots_token: self.config.user_agent.robots_token(),
                };
                join_all(batch.iter().map(|url| process_one(&ctx, url))).await
            };

            self.apply_outcomes(batch, outcomes)?;

            let elapsed = start.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                self.pages_processed as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(
                "Progress: {} pages processed, {} in frontier, {:.2} pages/sec",
                self.pages_processed,
                self.frontier.len(),
                rate
            );

            if self.checkpoint_due() {
                self.transition(CrawlPhase::Checkpointing)?;
                self.write_checkpoint();
                self.transition(CrawlPhase::Running)?;
            }
        }

        if self.frontier.is_empty() {
            tracing::info!("Frontier is empty, crawl complete");
        } else if self.pages_processed >= max_pages {
            tracing::info!("Page budget of {} reached", max_pages);
        }

        Ok(())
    }

    /// Dequeues up to `size` URLs that have not been processed in this run
    fn next_batch(&mut self, size: usize) -> Vec<String> {
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            let Some(url) = self.frontier.pop_front() else {
                break;
            };
            if self.processed.insert(url.clone()) {
                batch.push(url);
            } else {
                tracing::debug!("Skipping already processed {}", url);
            }
        }
        batch
    }

    /// Applies a batch's outcomes in frontier order
    ///
    /// If a record cannot be written, that page and every later page of the
    /// batch go back to the front of the frontier, so the final checkpoint
    /// still lists them.
    fn apply_outcomes(&mut self, batch: Vec<String>, outcomes: Vec<PageOutcome>) -> Result<()> {
        let mut pending = batch.into_iter().zip(outcomes);
        while let Some((url, outcome)) = pending.next() {
            if let Err(e) = self.handle_outcome(url.clone(), outcome) {
                let unrecorded: Vec<String> = std::iter::once(url)
                    .chain(pending.by_ref().map(|(url, _)| url))
                    .collect();
                tracing::warn!(
                    "Returning {} unrecorded URLs to the frontier",
                    unrecorded.len()
                );
                for url in unrecorded.into_iter().rev() {
                    self.processed.remove(&url);
                    self.frontier.push_front(url);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn handle_outcome(&mut self, url: String, outcome: PageOutcome) -> Result<()> {
        let domain = host_of(&url);

        match outcome {
            PageOutcome::Disallowed => {
                tracing::debug!("Disallowed by robots.txt: {}", url);
                self.robots_skipped += 1;
            }

            PageOutcome::Failed { kind, error } => {
                self.count_page();
                tracing::warn!("Fetch failed for {} ({}): {}", url, kind, error);
                self.metrics.record_failure(&domain, &kind.label());
            }

            PageOutcome::Fetched {
                fetch,
                extraction,
                fetched_at,
            } => {
                self.count_page();
                self.cache_page(&fetch, fetched_at);

                if fetch.is_error_status() {
                    let kind = classify_status(fetch.status_code);
                    tracing::debug!("{} answered {} ({})", url, fetch.status_code, kind);
                    self.metrics.record_failure(&domain, &kind.label());
                    return Ok(());
                }

                self.metrics.record_success(&domain);
                let Some((extractor, record)) = extraction else {
                    return Ok(());
                };

                let limit = self.link_limit;
                let added = record
                    .links
                    .iter()
                    .filter(|link| self.enqueue(link))
                    .take(limit)
                    .count();
                tracing::debug!(
                    "Processed {} with {}: {} links, {} new",
                    url,
                    extractor,
                    record.links.len(),
                    added
                );

                self.sink.write(&OutputRecord {
                    url,
                    final_url: fetch.final_url,
                    status: fetch.status_code,
                    title: record.title,
                    text: record.text,
                    links: record.links,
                    extractor,
                    fetched_at,
                })?;
            }
        }

        Ok(())
    }

    fn count_page(&mut self) {
        self.pages_processed += 1;
        self.since_checkpoint += 1;
    }

    fn cache_page(&mut self, fetch: &FetchResult, fetched_at: DateTime<Utc>) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        let page = CachedPage {
            url: fetch.requested_url.clone(),
            final_url: fetch.final_url.clone(),
            fetched_at,
            status_code: fetch.status_code,
            body: fetch.body.clone(),
        };
        if let Err(e) = cache.put(&page) {
            tracing::warn!("Failed to cache {}: {}", page.url, e);
        }
    }

    fn checkpoint_due(&self) -> bool {
        self.config.output.checkpoint_path.is_some()
            && self.since_checkpoint >= self.config.output.checkpoint_every.max(1)
    }

    /// Saves frontier and seen set; failures are logged, never fatal
    ///
    /// Output is flushed first: a checkpoint must never mark a page done
    /// before its record is on disk.
    fn write_checkpoint(&mut self) {
        self.since_checkpoint = 0;
        let Some(path) = &self.config.output.checkpoint_path else {
            return;
        };
        if let Err(e) = self.sink.flush() {
            tracing::warn!("Skipping checkpoint, output flush failed: {}", e);
            return;
        }
        if let Err(e) = checkpoint::save(path, &self.frontier, &self.seen) {
            tracing::warn!("Failed to write checkpoint {}: {}", path.display(), e);
        }
    }

    /// Final checkpoint, output flush and report
    fn finish(&mut self, started_at: DateTime<Utc>, cancelled: bool) -> Result<CrawlReport> {
        if self.phase.can_transition_to(CrawlPhase::Checkpointing) {
            self.transition(CrawlPhase::Checkpointing)?;
        }
        self.write_checkpoint();
        self.transition(CrawlPhase::Done)?;

        let flushed = self.sink.flush();

        let report = CrawlReport {
            summary: self.metrics.summary(),
            pages_processed: self.pages_processed,
            robots_skipped: self.robots_skipped,
            frontier_remaining: self.frontier.len(),
            seen_total: self.seen.len(),
            cancelled,
            started_at,
            finished_at: Utc::now(),
        };
        write_report(&self.config.output.report_path, &report)?;
        tracing::info!(
            "Report written to {}",
            self.config.output.report_path.display()
        );

        flushed?;
        Ok(report)
    }
}

/// Runs a complete crawl without external cancellation
///
/// # Example
///
/// ```no_run
/// use ripple_harvest::config::load_config;
/// use ripple_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} pages ok", report.summary.ok);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
    Orchestrator::new(config)?
        .run(CancellationToken::new())
        .await
}
