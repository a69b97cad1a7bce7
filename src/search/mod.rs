//! Search-engine URL building
//!
//! Expands free-text queries into result-page URLs for a fixed set of
//! providers. Result pages are crawled like any other seed; their links are
//! extracted by the search-results plugin.

use std::collections::{BTreeMap, HashSet};
use url::Url;

/// A general web-search provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchProvider {
    DuckDuckGo,
    Bing,
    Brave,
}

impl SearchProvider {
    /// Every provider, in expansion order
    pub const ALL: [SearchProvider; 3] = [
        SearchProvider::DuckDuckGo,
        SearchProvider::Bing,
        SearchProvider::Brave,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SearchProvider::DuckDuckGo => "duckduckgo",
            SearchProvider::Bing => "bing",
            SearchProvider::Brave => "brave",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            SearchProvider::DuckDuckGo => "https://html.duckduckgo.com/html/",
            SearchProvider::Bing => "https://www.bing.com/search",
            SearchProvider::Brave => "https://search.brave.com/search",
        }
    }

    /// Result-page URL for `query`, with the query form-encoded
    pub fn result_url(&self, query: &str) -> String {
        match Url::parse(self.endpoint()) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("q", query.trim());
                url.to_string()
            }
            // endpoints are constants; this arm is unreachable in practice
            Err(_) => self.endpoint().to_string(),
        }
    }
}

/// Builds one result-page URL per provider for `query`
///
/// # Examples
///
/// ```
/// use ripple_harvest::search::build_search_urls;
///
/// let urls = build_search_urls("rust crawler");
/// assert_eq!(urls["bing"], "https://www.bing.com/search?q=rust+crawler");
/// ```
pub fn build_search_urls(query: &str) -> BTreeMap<&'static str, String> {
    SearchProvider::ALL
        .iter()
        .map(|provider| (provider.name(), provider.result_url(query)))
        .collect()
}

/// Expands every query against every provider
///
/// Blank queries are skipped. The result holds no duplicates and keeps
/// first-seen order: query order first, provider order within a query.
pub fn build_multi_query_urls(queries: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for query in queries.iter().filter(|q| !q.trim().is_empty()) {
        for provider in SearchProvider::ALL {
            let url = provider.result_url(query);
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    urls
}
