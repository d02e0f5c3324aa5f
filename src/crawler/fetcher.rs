//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's user agent string
//! - GET requests bounded by the per-request timeout
//! - Classifying transport failures into timeouts and other fetch errors
//!
//! Status codes are not judged here. The caller decides what a non-success
//! status means for the URL it requested.

use crate::config::UserAgentConfig;
use crate::CrawlError;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: String,

    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body decoded as text
    pub body: String,
}

impl FetchedPage {
    /// Returns true for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns a header value if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Formats the user agent string sent with every request
///
/// Format: `CrawlerName/Version (+ContactURL)`, or `CrawlerName/Version`
/// when no contact URL is configured.
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    match &config.contact_url {
        Some(contact) => format!(
            "{}/{} (+{})",
            config.crawler_name, config.crawler_version, contact
        ),
        None => format!("{}/{}", config.crawler_name, config.crawler_version),
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Upper bound for one whole request, body included
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use driftnet::config::UserAgentConfig;
/// use driftnet::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "driftnet".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: Some("https://example.com/bot".to_string()),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(3)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues GET requests on behalf of the crawl engine
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher with its own client
    pub fn from_config(config: &UserAgentConfig, timeout: Duration) -> Result<Self, CrawlError> {
        Ok(Self::new(build_http_client(config, timeout)?))
    }

    /// Fetches a URL and reads its body
    ///
    /// Any status code is a successful fetch. Only transport failures are
    /// errors: `CrawlError::Timeout` when the request timed out, otherwise
    /// `CrawlError::Fetch`.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        tracing::trace!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        tracing::debug!("Fetched {} with status {} ({} bytes)", url, status, body.len());

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status,
            headers,
            body,
        })
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        CrawlError::Fetch {
            url: url.to_string(),
            source: error,
        }
    }
}
