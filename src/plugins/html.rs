//! HTML helpers shared by the extraction plugins
//!
//! - Page title lookup
//! - Whitespace-normalized text blocks
//! - Link resolution to absolute http(s) URLs

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Parses a CSS selector, turning the borrowed error into an owned message
pub(crate) fn parse_selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{}': {}", css, e))
}

/// Text of an element with runs of whitespace collapsed to single spaces
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first element matching `selector` that has any
pub(crate) fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Texts of the first `max` non-empty elements matching `selector`
pub(crate) fn collect_blocks(document: &Html, selector: &Selector, max: usize) -> Vec<String> {
    document
        .select(selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .take(max)
        .collect()
}

/// Absolute URLs of the first `max` resolvable `href`s among matched elements
///
/// Elements without an `href` and `download` links are skipped.
pub(crate) fn collect_links(
    document: &Html,
    selector: &Selector,
    base_url: &Url,
    max: usize,
) -> Vec<String> {
    document
        .select(selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .take(max)
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - empty hrefs and fragment-only links (same page anchors)
/// - javascript:, mailto:, tel: schemes and data: URIs
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
