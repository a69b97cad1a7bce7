use crate::{UrlError, UrlResult};
use url::Url;

/// Tracking query parameters dropped from canonical keys (matched case-insensitively)
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "fbclid",
    "gclid",
    "dclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "igshid",
    "yclid",
    "_hsenc",
    "_hsmi",
];

/// Schemes that can never be crawled, even when written without `//`
const NON_CRAWLABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Canonicalizes a URL into the stable string key used for deduplication
///
/// Returns an empty string when the input cannot be crawled (empty,
/// whitespace-only, unparseable or non-HTTP). An empty result means
/// "do not enqueue".
///
/// # Examples
///
/// ```
/// use ripple_harvest::url::canonicalize;
///
/// assert_eq!(
///     canonicalize("https://Example.com/path/?UTM_Source=x&a=1&fbclid=abc"),
///     "https://example.com/path?a=1"
/// );
/// assert_eq!(canonicalize("example.com"), "https://example.com/");
/// assert_eq!(canonicalize(""), "");
/// ```
pub fn canonicalize(raw: &str) -> String {
    canonical_url(raw)
        .map(|url| url.to_string())
        .unwrap_or_default()
}

/// Parses and canonicalizes a URL, keeping the typed form
///
/// # Canonicalization Steps
///
/// 1. Trim; reject empty input
/// 2. Assume `https://` when the input has no scheme
/// 3. Lowercase scheme and host, drop default ports (done by the parser)
/// 4. Strip trailing slashes from non-root paths
/// 5. Drop tracking query parameters, sort the remaining pairs
/// 6. Drop the fragment
pub fn canonical_url(raw: &str) -> UrlResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let lowered = trimmed.to_ascii_lowercase();
    if NON_CRAWLABLE_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return Err(UrlError::InvalidScheme(trimmed.to_string()));
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    let path = strip_trailing_slashes(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Checks for a `scheme://` prefix ahead of any path, query or fragment
///
/// `example.com/go?to=https://other.com` has no scheme of its own.
fn has_scheme(raw: &str) -> bool {
    match raw.find("://") {
        Some(idx) => !raw[..idx].contains(|c| matches!(c, '/' | '?' | '#')),
        None => false,
    }
}

/// Removes trailing slashes unless the path is the root
fn strip_trailing_slashes(path: &str) -> String {
    let stripped = path.trim_end_matches('/');
    if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}
