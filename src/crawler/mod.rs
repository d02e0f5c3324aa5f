//! Crawler module: the crawl engine and its collaborators
//!
//! This module contains the core crawling logic, including:
//! - The engine handle and its sequential crawl loop
//! - The per-host domain configuration cache (robots.txt and sitemaps)
//! - HTTP fetching with a per-request timeout
//! - Document and stylesheet link extraction
//! - Frontier and visited-set bookkeeping
//! - Event channels and the subscriber registry
//! - URL filters

mod coordinator;
mod domains;
mod events;
mod fetcher;
mod filter;
mod parser;
mod scheduler;
mod sitemap;

pub use coordinator::{Crawler, CrawlerBuilder};
pub use domains::{domain_url, DomainConfig, DomainConfigCache, DomainLookup};
pub use events::{Channel, CrawlEvent, CrawledPage, DisallowReason, EventBus, SubscriptionId};
pub use fetcher::{build_http_client, user_agent_string, FetchedPage, Fetcher};
pub use filter::{AcceptAll, DomainFilter, UrlFilter};
pub use parser::{extract_css_urls, is_markup_content_type, is_noindex, parse_page, ParsedPage};
pub use scheduler::{CrawlSnapshot, Scheduler};
pub use sitemap::{parse_sitemap, parse_text_sitemap, parse_xml_sitemap, SitemapFormat, FALLBACK_SITEMAPS};
