use super::html::{element_text, parse_selector, resolve_link};
use super::{is_search_engine_host, ExtractionRecord, Extractor};
use crate::url::host_of;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

/// Maximum number of result links kept from a result page
pub const MAX_RESULT_LINKS: usize = 120;

/// Maximum number of result titles joined into the page text
pub const MAX_RESULT_TITLES: usize = 30;

// DuckDuckGo html, Bing, Brave, then generic headings
const RESULT_TITLE_SELECTOR: &str = "a.result__a, li.b_algo h2, .snippet-title, h3";

/// Extraction routine for search-engine result pages
///
/// Unwraps redirect-wrapped result links back to their destination, drops
/// links that point back at a search engine, and deduplicates the rest in
/// first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SearchResultsExtractor;

impl SearchResultsExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for SearchResultsExtractor {
    fn name(&self) -> &str {
        "search_results"
    }

    fn extract(&self, url: &Url, html: &str) -> ExtractionRecord {
        let document = Html::parse_document(html);
        let mut record = ExtractionRecord::default();

        if let Ok(selector) = parse_selector("title") {
            record.title = document
                .select(&selector)
                .map(element_text)
                .find(|t| !t.is_empty())
                .unwrap_or_default();
        }

        if let Ok(selector) = parse_selector(RESULT_TITLE_SELECTOR) {
            let titles: Vec<String> = document
                .select(&selector)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .take(MAX_RESULT_TITLES)
                .collect();
            record.text = titles.join("\n");
        }

        if let Ok(selector) = parse_selector("a[href]") {
            let mut seen = HashSet::new();
            record.links = document
                .select(&selector)
                .filter_map(|element| element.value().attr("href"))
                .filter_map(|href| resolve_link(href, url))
                .filter_map(|link| unwrap_redirect(&link))
                .filter(|link| !is_search_engine_host(&host_of(link)))
                .filter(|link| seen.insert(link.clone()))
                .take(MAX_RESULT_LINKS)
                .collect();
        }

        record
    }
}

/// Returns the real destination of a redirect-wrapped result link
///
/// Handles the `uddg=` parameter (DuckDuckGo) and `/url?q=` / `/url?url=`
/// (Google). Links that are not wrapped come back unchanged. Returns None
/// when the unwrapped destination is not an http(s) URL.
pub fn unwrap_redirect(link: &str) -> Option<String> {
    let Ok(parsed) = Url::parse(link) else {
        return Some(link.to_string());
    };

    let is_url_wrapper = parsed.path() == "/url";
    let target = parsed.query_pairs().find_map(|(key, value)| {
        let wrapped = key == "uddg" || (is_url_wrapper && (key == "q" || key == "url"));
        wrapped.then(|| value.into_owned())
    });

    match target {
        None => Some(link.to_string()),
        Some(target) => {
            let target = Url::parse(&target).ok()?;
            matches!(target.scheme(), "http" | "https").then(|| target.to_string())
        }
    }
}
