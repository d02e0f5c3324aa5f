//! Per-domain configuration cache
//!
//! The first URL seen for a host triggers a robots.txt fetch and sitemap
//! discovery for that host. The result is cached for the rest of the
//! engine's life and never refreshed.

use crate::crawler::events::{CrawlEvent, EventBus};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::sitemap::{parse_sitemap, SitemapFormat, FALLBACK_SITEMAPS};
use crate::robots::RobotsPolicy;
use crate::url::{host_key, normalized_join};
use crate::{CrawlError, UrlError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// Robots policy and sitemap list for one host
#[derive(Debug, Clone)]
pub struct DomainConfig {
    /// Cache key: lowercase host, plus `:port` when explicit
    pub host: String,

    /// Parsed robots.txt, permissive when none could be fetched
    pub robots: RobotsPolicy,

    /// Sitemaps that were fetched and parsed successfully, plus declared
    /// sitemaps of an unrecognised format
    pub sitemap_urls: Vec<String>,
}

impl DomainConfig {
    /// Returns true if the host has at least one known sitemap
    pub fn has_sitemap(&self) -> bool {
        !self.sitemap_urls.is_empty()
    }
}

/// Result of a cache lookup
#[derive(Debug)]
pub struct DomainLookup {
    pub config: Arc<DomainConfig>,

    /// URLs read from the host's sitemaps; empty unless the entry was created
    /// by this lookup
    pub discovered: Vec<String>,
}

/// Lazily populated map from host key to [`DomainConfig`]
#[derive(Debug, Default)]
pub struct DomainConfigCache {
    entries: Mutex<HashMap<String, Arc<DomainConfig>>>,
}

impl DomainConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<DomainConfig>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached configuration for a host key
    pub fn get(&self, host: &str) -> Option<Arc<DomainConfig>> {
        self.lock().get(&host.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the configuration for `url`'s host, building it on first use
    ///
    /// Building never fails: robots.txt and sitemap problems are reported
    /// on `events` and degrade to a permissive policy or a shorter sitemap
    /// list. Only a URL without a host is an error.
    pub async fn get_or_create(
        &self,
        url: &Url,
        fetcher: &Fetcher,
        events: &EventBus,
    ) -> Result<DomainLookup, CrawlError> {
        let host = host_key(url).ok_or_else(|| CrawlError::invalid_url(url.as_str(), UrlError::MissingHost))?;

        if let Some(config) = self.lock().get(&host).cloned() {
            return Ok(DomainLookup {
                config,
                discovered: Vec::new(),
            });
        }

        let (config, discovered) = build_domain_config(url.scheme(), &host, fetcher, events).await;
        let config = Arc::clone(
            self.lock()
                .entry(host)
                .or_insert_with(|| Arc::new(config)),
        );

        Ok(DomainLookup { config, discovered })
    }
}

/// Builds `<scheme>://<host>/<path>` with a normalized path
pub fn domain_url(scheme: &str, host: &str, path: &str) -> String {
    format!("{}://{}", scheme, normalized_join(&[host, path]))
}

async fn build_domain_config(
    scheme: &str,
    host: &str,
    fetcher: &Fetcher,
    events: &EventBus,
) -> (DomainConfig, Vec<String>) {
    tracing::debug!("Building domain configuration for {}", host);

    let robots = fetch_robots(scheme, host, fetcher, events).await;

    let candidates: Vec<String> = if robots.sitemap_urls().is_empty() {
        FALLBACK_SITEMAPS
            .iter()
            .map(|path| domain_url(scheme, host, path))
            .collect()
    } else {
        robots.sitemap_urls().to_vec()
    };

    let mut sitemap_urls = Vec::new();
    let mut discovered = Vec::new();

    for candidate in candidates {
        let Some(format) = SitemapFormat::from_url(&candidate) else {
            tracing::debug!("Not reading sitemap of unknown format: {}", candidate);
            sitemap_urls.push(candidate);
            continue;
        };

        match fetch_sitemap(&candidate, format, fetcher).await {
            Ok(urls) => {
                tracing::info!("Sitemap {} lists {} URLs", candidate, urls.len());
                discovered.extend(urls);
                sitemap_urls.push(candidate);
            }
            Err(error) => {
                tracing::warn!("Dropping sitemap {}: {}", candidate, error);
                events.emit(&CrawlEvent::Error {
                    url: candidate,
                    error,
                });
            }
        }
    }

    tracing::info!(
        "Configured domain {}: {} agents in robots.txt, {} sitemaps, {} sitemap URLs",
        host,
        robots.agents().len(),
        sitemap_urls.len(),
        discovered.len()
    );

    let config = DomainConfig {
        host: host.to_string(),
        robots,
        sitemap_urls,
    };
    (config, discovered)
}

async fn fetch_robots(scheme: &str, host: &str, fetcher: &Fetcher, events: &EventBus) -> RobotsPolicy {
    let robots_url = domain_url(scheme, host, "robots.txt");

    match fetcher.fetch(&robots_url).await {
        Ok(page) if page.is_success() => RobotsPolicy::parse(&page.body),
        Ok(page) => {
            let message = format!(
                "No robots.txt at {} (HTTP {}), allowing all paths",
                robots_url, page.status
            );
            tracing::warn!("{}", message);
            events.emit(&CrawlEvent::Warn { message });
            RobotsPolicy::allow_all()
        }
        Err(error) => {
            tracing::warn!("Failed to fetch {}: {}", robots_url, error);
            events.emit(&CrawlEvent::Error {
                url: robots_url,
                error,
            });
            RobotsPolicy::allow_all()
        }
    }
}

async fn fetch_sitemap(
    url: &str,
    format: SitemapFormat,
    fetcher: &Fetcher,
) -> Result<Vec<String>, CrawlError> {
    let page = fetcher.fetch(url).await?;
    if !page.is_success() {
        return Err(CrawlError::HttpStatus {
            url: url.to_string(),
            status: page.status,
        });
    }
    parse_sitemap(url, format, &page.body)
}
