use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks request bookkeeping for a single host
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests issued to this host in the current run
    pub request_count: u32,

    /// Start time of the most recent request slot handed out for this host
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a request can be made to this host right now
    pub fn can_request(&self, delay: Duration, now: Instant) -> bool {
        self.time_until_next_request(delay, now).is_none()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now.
    pub fn time_until_next_request(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let ready_at = last + delay;
        if ready_at > now {
            Some(ready_at - now)
        } else {
            None
        }
    }

    /// Records that a request was made to this host
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Reserves the next request slot and returns how long to wait for it
    ///
    /// The slot is recorded immediately, so concurrent callers for the same
    /// host queue up behind each other instead of all observing the same
    /// stale timestamp.
    pub fn reserve_slot(&mut self, delay: Duration, now: Instant) -> Duration {
        let wait = self.time_until_next_request(delay, now).unwrap_or_default();
        self.record_request(now + wait);
        wait
    }
}

/// Per-host request spacing shared by all in-flight fetches
///
/// Owned by one fetcher for the lifetime of a crawl run. The check-and-update
/// happens under a single lock; the sleep happens outside it.
#[derive(Debug)]
pub struct DomainPacing {
    delay: Duration,
    domains: Mutex<HashMap<String, DomainState>>,
}

impl DomainPacing {
    /// Creates pacing state enforcing `delay` between requests to one host
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configured spacing
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Reserves a slot for `host` as of `now`, returning the wait
    pub fn reserve(&self, host: &str, now: Instant) -> Duration {
        let mut domains = self
            .domains
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        domains
            .entry(host.to_string())
            .or_default()
            .reserve_slot(self.delay, now)
    }

    /// Waits until a request to `host` respects the spacing
    pub async fn wait_turn(&self, host: &str) {
        let wait = self.reserve(host, Instant::now());
        if !wait.is_zero() {
            tracing::trace!("Pacing {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of requests issued so far to `host`
    pub fn request_count(&self, host: &str) -> u32 {
        let domains = self
            .domains
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        domains.get(host).map(|s| s.request_count).unwrap_or(0)
    }
}
