//! User-supplied URL filters
//!
//! A filter is consulted before a discovered URL enters the frontier and
//! again when it is dequeued. Seeds passed to `start` skip the first check.

use crate::config::FilterConfig;
use crate::url::{extract_domain, matches_wildcard, parse_crawlable};
use futures::future::{BoxFuture, FutureExt};

/// Decides whether a URL may be crawled
///
/// Any `Fn(&str) -> bool` closure is a filter. Filters that need to await
/// something implement the trait directly and return a boxed future.
pub trait UrlFilter: Send + Sync {
    fn accept<'a>(&'a self, url: &'a str) -> BoxFuture<'a, bool>;
}

impl<F> UrlFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accept<'a>(&'a self, url: &'a str) -> BoxFuture<'a, bool> {
        let accepted = self(url);
        async move { accepted }.boxed()
    }
}

/// Filter that accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl UrlFilter for AcceptAll {
    fn accept<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, bool> {
        async { true }.boxed()
    }
}

/// Host-based filter built from the `[filter]` configuration section
///
/// A URL is rejected if its host matches any deny pattern. Otherwise it is
/// accepted when the allow list is empty or its host matches an allow
/// pattern. URLs that are not crawlable http(s) URLs are rejected.
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl DomainFilter {
    pub fn new(allow: Vec<String>, deny: Vec<String>) -> Self {
        Self {
            allow: allow.into_iter().map(|p| p.to_lowercase()).collect(),
            deny: deny.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.allow.clone(), config.deny.clone())
    }

    /// Returns true if the filter would accept `url`
    pub fn is_accepted(&self, url: &str) -> bool {
        let Some(host) = parse_crawlable(url).ok().as_ref().and_then(extract_domain) else {
            return false;
        };

        if self.deny.iter().any(|p| matches_wildcard(p, &host)) {
            tracing::trace!("Host {} matches a deny pattern", host);
            return false;
        }

        self.allow.is_empty() || self.allow.iter().any(|p| matches_wildcard(p, &host))
    }
}

impl UrlFilter for DomainFilter {
    fn accept<'a>(&'a self, url: &'a str) -> BoxFuture<'a, bool> {
        let accepted = self.is_accepted(url);
        async move { accepted }.boxed()
    }
}
