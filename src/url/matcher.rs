/// Checks if a host matches a wildcard pattern
///
/// Two pattern forms are supported:
/// 1. Exact match: `"bing.com"` matches only `"bing.com"`
/// 2. Wildcard match: `"*.duckduckgo.com"` matches the bare domain and
///    any subdomain (`"html.duckduckgo.com"`, `"lite.duckduckgo.com"`)
///
/// Hosts are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use ripple_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.duckduckgo.com", "duckduckgo.com"));
/// assert!(matches_wildcard("*.duckduckgo.com", "html.duckduckgo.com"));
/// assert!(!matches_wildcard("*.duckduckgo.com", "notduckduckgo.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Checks if a host matches any pattern in the list
pub fn matches_any(patterns: &[&str], candidate: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| matches_wildcard(pattern, candidate))
}
