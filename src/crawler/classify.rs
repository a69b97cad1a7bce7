//! Error classification for fetch outcomes
//!
//! Maps HTTP status codes and fetch errors onto a small, closed set of error
//! kinds. The kind labels are what the metrics report aggregates on, so they
//! must stay stable.

use crate::HarvestError;
use std::error::Error as StdError;
use std::fmt;

/// Classified reason for a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 401
    Unauthorized,
    /// HTTP 403, or an error mentioning a forbidden response
    Forbidden,
    /// HTTP 404
    NotFound,
    /// HTTP 429, or an error mentioning throttling
    RateLimited,
    /// HTTP 5xx, or an error mentioning a server fault
    ServerError,
    /// Any other non-success status
    Http(u16),
    /// The request timed out
    Timeout,
    /// TLS handshake or certificate failure
    SslError,
    /// Host name resolution failure
    DnsError,
    /// The site demands an authenticated session
    LoginRequired,
    /// Nothing else matched
    UnknownError,
}

impl ErrorKind {
    /// Returns the label used in metrics and reports
    pub fn label(&self) -> String {
        match self {
            Self::Unauthorized => "unauthorized".to_string(),
            Self::Forbidden => "forbidden".to_string(),
            Self::NotFound => "not_found".to_string(),
            Self::RateLimited => "rate_limited".to_string(),
            Self::ServerError => "server_error".to_string(),
            Self::Http(code) => format!("http_{}", code),
            Self::Timeout => "timeout".to_string(),
            Self::SslError => "ssl_error".to_string(),
            Self::DnsError => "dns_error".to_string(),
            Self::LoginRequired => "login_required".to_string(),
            Self::UnknownError => "unknown_error".to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classifies an HTTP status code
///
/// Only meaningful for non-success codes; the orchestrator calls it for
/// responses with status >= 400.
pub fn classify_status(code: u16) -> ErrorKind {
    match code {
        401 => ErrorKind::Unauthorized,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::ServerError,
        other => ErrorKind::Http(other),
    }
}

/// Classifies an error by its textual description
///
/// Case-insensitive substring heuristics, checked in order. Order matters:
/// a TLS failure message often also mentions "connection".
pub fn classify_exception(description: &str) -> ErrorKind {
    let text = description.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));

    if has(&["timeout", "timed out", "deadline has elapsed"]) {
        ErrorKind::Timeout
    } else if has(&["ssl", "tls", "certificate", "handshake"]) {
        ErrorKind::SslError
    } else if has(&[
        "dns",
        "failed to lookup address",
        "name or service not known",
        "nodename nor servname",
        "no such host",
        "getaddrinfo",
        "name resolution",
    ]) {
        ErrorKind::DnsError
    } else if has(&["403", "forbidden", "access denied"]) {
        ErrorKind::Forbidden
    } else if has(&["429", "too many requests", "rate limit"]) {
        ErrorKind::RateLimited
    } else if has(&["500", "502", "503", "504", "server error", "bad gateway"]) {
        ErrorKind::ServerError
    } else if has(&["login", "log in", "sign in", "401", "unauthorized"]) {
        ErrorKind::LoginRequired
    } else {
        ErrorKind::UnknownError
    }
}

/// Classifies the error a fetch propagated after exhausting its retries
///
/// Transport errors are inspected structurally first; everything else falls
/// back to the text heuristic over the error chain. The request URL is
/// removed from that text so a path like `/login` cannot decide the kind.
pub fn classify_fetch_error(err: &HarvestError) -> ErrorKind {
    match err {
        HarvestError::Http { url, source } => {
            if source.is_timeout() {
                return ErrorKind::Timeout;
            }
            if let Some(status) = source.status() {
                return classify_status(status.as_u16());
            }

            let mut text = error_chain_text(source);
            if let Some(request_url) = source.url() {
                text = text.replace(request_url.as_str(), "");
            }
            classify_exception(&text.replace(url.as_str(), ""))
        }
        other => classify_exception(&error_chain_text(other)),
    }
}

/// Joins an error and all of its sources into one string
fn error_chain_text(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}
