//! Robots.txt handling module
//!
//! This module provides fetching, parsing and caching of robots.txt policies.
//! Fetching fails open: any transport error or error status is treated as
//! "everything allowed".

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Timeout for a single robots.txt request
pub const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Answers allow/deny questions for URLs, fetching robots.txt per origin
///
/// Shares the fetcher's HTTP client. Policies are cached per origin
/// (`scheme://host[:port]`) for the lifetime of the checker. Concurrent
/// checks against an uncached origin share a single robots.txt request.
pub struct RobotsChecker {
    client: Client,
    timeout: Duration,
    cache: Mutex<HashMap<String, Arc<OnceCell<CachedRobots>>>>,
}

impl RobotsChecker {
    /// Creates a checker using the given HTTP client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: ROBOTS_TIMEOUT,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the robots.txt request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks if `url` may be fetched by `user_agent`
    ///
    /// # Arguments
    ///
    /// * `url` - The URL about to be fetched
    /// * `user_agent` - The robots product token
    ///
    /// # Returns
    ///
    /// * `true` - If allowed, or if the policy could not be determined
    /// * `false` - If robots.txt disallows the URL
    pub async fn allowed(&self, url: &Url, user_agent: &str) -> bool {
        let origin = url.origin();
        if !origin.is_tuple() {
            return true;
        }
        let origin = origin.ascii_serialization();

        let cell = self.cell_for(&origin);
        let policy = cell
            .get_or_init(|| async {
                CachedRobots::new(fetch_robots(&self.client, &origin, self.timeout).await)
            })
            .await;
        policy.is_allowed(url.as_str(), user_agent)
    }

    /// Number of origins with a fetched policy
    pub fn cached_origins(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    /// Returns the shared slot for `origin`, replacing it once stale
    fn cell_for(&self, origin: &str) -> Arc<OnceCell<CachedRobots>> {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let cell = cache.entry(origin.to_string()).or_default();
        if cell.get().is_some_and(CachedRobots::is_stale) {
            tracing::debug!("Cached robots.txt for {} is stale, refetching", origin);
            *cell = Arc::default();
        } else if cell.initialized() {
            tracing::trace!("Using cached robots.txt for {}", origin);
        }
        Arc::clone(cell)
    }
}

/// Fetches and parses robots.txt for an origin
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `origin` - Serialized origin, e.g. `https://example.com`
/// * `timeout` - Request timeout
///
/// # Returns
///
/// The parsed policy, or an allow-all policy when the file is missing,
/// unreachable or answered with a 4xx/5xx status.
pub async fn fetch_robots(client: &Client, origin: &str, timeout: Duration) -> ParsedRobots {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = match client.get(&robots_url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("robots.txt fetch failed for {}: {}", origin, e);
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::debug!("robots.txt for {} answered {}, allowing all", origin, status);
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::debug!("robots.txt body unreadable for {}: {}", origin, e);
            ParsedRobots::allow_all()
        }
    }
}
