//! Content extraction plugins
//!
//! An extractor turns a fetched page's URL and HTML into an
//! [`ExtractionRecord`]. Extractors are pure: no I/O, no shared state.
//!
//! Which extractor runs for a page is decided per host by the
//! [`PluginManager`]:
//! 1. Known search-engine hosts get the [`SearchResultsExtractor`]
//! 2. Hosts with a `<host>.toml` file in the plugin directory get a
//!    [`SelectorExtractor`]
//! 3. Everything else gets the [`DefaultExtractor`]

mod default;
mod html;
mod manager;
mod search_results;
mod selector;

pub use default::{DefaultExtractor, DEFAULT_MAX_BLOCKS, DEFAULT_MAX_LINKS};
pub use manager::PluginManager;
pub use search_results::{unwrap_redirect, SearchResultsExtractor, MAX_RESULT_LINKS, MAX_RESULT_TITLES};
pub use selector::{SelectorExtractor, SelectorPluginFile};

use crate::url::matches_any;
use serde::Serialize;
use url::Url;

/// Hosts whose pages are search result listings
pub const SEARCH_ENGINE_HOSTS: &[&str] = &[
    "*.duckduckgo.com",
    "*.bing.com",
    "*.google.com",
    "search.brave.com",
    "*.search.yahoo.com",
    "*.startpage.com",
];

/// Structured content extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionRecord {
    pub title: String,
    pub text: String,
    /// Absolute outbound links in document order
    pub links: Vec<String>,
}

/// An extraction routine
pub trait Extractor: Send + Sync {
    /// Name recorded in output records
    fn name(&self) -> &str;

    /// Extracts title, text and outbound links from a page
    fn extract(&self, url: &Url, html: &str) -> ExtractionRecord;
}

/// Checks if `host` serves search-engine result pages
pub fn is_search_engine_host(host: &str) -> bool {
    matches_any(SEARCH_ENGINE_HOSTS, &host.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_engine_hosts() {
        assert!(is_search_engine_host("html.duckduckgo.com"));
        assert!(is_search_engine_host("www.bing.com"));
        assert!(is_search_engine_host("WWW.GOOGLE.COM"));
        assert!(is_search_engine_host("search.brave.com"));
        assert!(!is_search_engine_host("brave.com"));
        assert!(!is_search_engine_host("example.com"));
        assert!(!is_search_engine_host(""));
    }
}
