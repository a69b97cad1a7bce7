use url::Url;

/// Extracts the lowercase host from a parsed URL
///
/// Ports are not part of the result, so `example.com:8080` and `example.com`
/// share pacing and metrics buckets.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the lowercase host from a URL string
///
/// Returns an empty string when the input does not parse or has no host,
/// which callers use as the "unknown" metrics bucket.
pub fn host_of(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| extract_domain(&url))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://news.example.org/a?b=c"), "news.example.org");
        assert_eq!(host_of("not a url"), "");
    }
}
