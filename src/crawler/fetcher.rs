//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler:
//! - Building the HTTP client with a descriptive user agent
//! - Bounding in-flight requests with a permit pool
//! - Enforcing per-host spacing before every attempt
//! - Retrying raised errors with exponential backoff
//!
//! The fetcher never interprets status codes. A 404 or 503 is returned as a
//! normal `FetchResult`; the orchestrator classifies it afterwards.

use crate::config::UserAgentConfig;
use crate::crawler::retry::{run_with_retry, RetryPolicy};
use crate::state::DomainPacing;
use crate::url::extract_domain;
use crate::{HarvestError, UrlError};
use reqwest::{redirect::Policy, Client};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use url::Url;

/// Response details that are not part of the page content
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseMetadata {
    /// Content-Type header value
    pub content_type: Option<String>,

    /// Content-Length header value, when announced
    pub content_length: Option<u64>,

    /// Attempts used, including the successful one
    pub attempts: u32,

    /// Wall time of the successful attempt in milliseconds
    pub elapsed_ms: u64,
}

/// Result of a fetch that received a response
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL that was requested
    pub requested_url: String,

    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Response body
    pub body: String,

    /// Header and timing details
    pub metadata: ResponseMetadata,
}

impl FetchResult {
    /// Returns true for 4xx/5xx responses
    pub fn is_error_status(&self) -> bool {
        self.status_code >= 400
    }
}

/// Builds the HTTP client shared by the fetcher and the robots checker
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Per-request timeout
/// * `verify_ssl` - Whether to reject invalid certificates
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
    verify_ssl: bool,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .danger_accept_invalid_certs(!verify_ssl)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited, retrying page fetcher
///
/// One instance per crawl run. Owns the permit pool and the per-host pacing
/// state; both are shared by every concurrent `fetch` call.
pub struct Fetcher {
    client: Client,
    permits: Arc<Semaphore>,
    pacing: DomainPacing,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use
    /// * `concurrency` - Maximum number of in-flight fetches
    /// * `per_domain_delay` - Minimum spacing between requests to one host
    pub fn new(client: Client, concurrency: usize, per_domain_delay: Duration) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            pacing: DomainPacing::new(per_domain_delay),
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the shared HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the per-host pacing state
    pub fn pacing(&self) -> &DomainPacing {
        &self.pacing
    }

    /// Fetches a URL
    ///
    /// # Request Flow
    ///
    /// 1. Acquire a permit from the pool
    /// 2. For each attempt, wait out the host's spacing, then GET
    /// 3. Retry raised errors with backoff, up to the policy's attempts
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - A response was received (any status)
    /// * `Err(HarvestError)` - The URL was invalid or every attempt failed
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, HarvestError> {
        let parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
        let host = extract_domain(&parsed).ok_or(UrlError::MissingDomain)?;

        // The semaphore is never closed, so acquire only fails if it is
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| HarvestError::Io(std::io::Error::other(e)))?;

        let host = host.as_str();
        run_with_retry(&self.retry, |attempt| {
            let parsed = parsed.clone();
            async move {
                self.pacing.wait_turn(host).await;
                self.fetch_once(parsed, attempt).await
            }
        })
        .await
    }

    async fn fetch_once(&self, url: Url, attempt: u32) -> Result<FetchResult, HarvestError> {
        let requested_url = url.to_string();
        tracing::debug!("GET {} (attempt {})", requested_url, attempt);

        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: requested_url.clone(),
                source,
            })?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();

        let body = response.text().await.map_err(|source| HarvestError::Http {
            url: requested_url.clone(),
            source,
        })?;

        Ok(FetchResult {
            requested_url,
            final_url,
            status_code,
            body,
            metadata: ResponseMetadata {
                content_type,
                content_length,
                attempts: attempt,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        })
    }
}
