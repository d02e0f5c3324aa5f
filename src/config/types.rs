use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Driftnet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seed URLs the crawl starts from
    pub seeds: Vec<String>,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

/// Crawl engine behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Politeness delay between processed URLs (milliseconds)
    pub delay: u64,

    /// Upper bound for each network operation (milliseconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Whether robots.txt rules and noindex directives are honored
    #[serde(rename = "honor-bot-rules")]
    pub honor_bot_rules: bool,

    /// Whether in-page links are ignored for hosts that publish a sitemap
    #[serde(rename = "only-follow-sitemap")]
    pub only_follow_sitemap: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            delay: 100,
            request_timeout: 3000,
            honor_bot_rules: true,
            only_follow_sitemap: true,
        }
    }
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

/// Host filter configuration
///
/// Patterns are domains, optionally prefixed with `*.` to also match every
/// subdomain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Hosts that may be crawled; empty means every host
    pub allow: Vec<String>,

    /// Hosts that are never crawled, even if allowed
    pub deny: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./driftnet.db".to_string(),
        }
    }
}
