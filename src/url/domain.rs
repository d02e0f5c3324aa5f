use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the lowercase hostname from a URL, without any port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use driftnet::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the key under which a URL's domain configuration is cached
///
/// This is the lowercase host followed by `:port` when the URL carries an
/// explicit, non-default port. Two servers on the same host but different
/// ports have different robots.txt files, so they get separate entries.
///
/// ```
/// use url::Url;
/// use driftnet::url::host_key;
///
/// let url = Url::parse("http://127.0.0.1:4321/a").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:4321".to_string()));
///
/// let url = Url::parse("https://example.com:443/a").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Parses a URL the crawl loop is able to fetch
///
/// The URL must be absolute, use http or https, and carry a host.
pub fn parse_crawlable(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Matches a host against a domain pattern
///
/// `*.example.com` matches `example.com` itself and any subdomain of it.
/// Any other pattern must equal the host exactly. Both arguments are
/// expected in lowercase.
///
/// # Examples
///
/// ```
/// use driftnet::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "deep.blog.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "www.example.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => pattern == host,
    }
}
