//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl engine handle and its loop, which
//! coordinates:
//! - The start/pause/resume/stop state machine
//! - Dequeuing from the frontier and enforcing the visited set
//! - Domain configuration lookup and robots.txt enforcement
//! - Fetching, noindex handling, link extraction and the politeness delay
//!
//! The loop is strictly sequential: one URL is fully processed before the
//! next one is dequeued.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::domains::{DomainConfig, DomainConfigCache};
use crate::crawler::events::{Channel, CrawlEvent, CrawledPage, DisallowReason, EventBus, SubscriptionId};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::filter::{AcceptAll, UrlFilter};
use crate::crawler::parser::{extract_css_urls, is_noindex, parse_page};
use crate::crawler::scheduler::{CrawlSnapshot, Scheduler};
use crate::robots;
use crate::state::{EngineControl, EngineState, SessionId};
use crate::url::parse_crawlable;
use crate::CrawlError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shortest sleep between checks of the paused flag
const PAUSE_POLL_FLOOR: Duration = Duration::from_millis(10);

/// Response header carrying robots directives
const ROBOTS_HEADER: &str = "x-robots-tag";

/// Outcome of processing one dequeued URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Dropped before any network request for the URL itself
    Skipped,

    /// A fetch was attempted; the politeness delay applies
    Attempted,
}

struct Inner {
    config: CrawlerConfig,
    fetcher: Fetcher,
    filter: Arc<dyn UrlFilter>,
    events: EventBus,
    control: EngineControl,
    scheduler: Mutex<Scheduler>,
    domains: DomainConfigCache,
    run_lock: tokio::sync::Mutex<()>,
}

/// Handle to a crawl engine
///
/// Cloning is cheap and every clone controls the same engine, so a crawl
/// can be paused or stopped from another task (or from an event handler)
/// while `start` is running.
///
/// # Example
///
/// ```no_run
/// use driftnet::{Channel, CrawlEvent, Crawler, CrawlerConfig};
///
/// # async fn run() -> driftnet::Result<()> {
/// let crawler = Crawler::new(CrawlerConfig::default())?;
/// crawler.on(Channel::AfterCrawl, |event| {
///     if let CrawlEvent::AfterCrawl(page) = event {
///         println!("{} -> {} links", page.url, page.links.len());
///     }
/// });
/// crawler.start(Some("https://example.com/")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Crawler {
    inner: Arc<Inner>,
}

/// Builder for [`Crawler`]
pub struct CrawlerBuilder {
    config: CrawlerConfig,
    user_agent: UserAgentConfig,
    filter: Arc<dyn UrlFilter>,
}

impl CrawlerBuilder {
    /// Sets the identity sent in the `User-Agent` header
    pub fn user_agent(mut self, user_agent: UserAgentConfig) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Sets the predicate consulted for every discovered URL
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: UrlFilter + 'static,
    {
        self.filter = Arc::new(filter);
        self
    }

    /// Builds the engine and its HTTP client
    pub fn build(self) -> Result<Crawler, CrawlError> {
        let fetcher = Fetcher::from_config(&self.user_agent, self.config.timeout())?;

        Ok(Crawler {
            inner: Arc::new(Inner {
                config: self.config,
                fetcher,
                filter: self.filter,
                events: EventBus::new(),
                control: EngineControl::new(),
                scheduler: Mutex::new(Scheduler::new()),
                domains: DomainConfigCache::new(),
                run_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }
}

impl Crawler {
    /// Creates an engine with the default user agent and no URL filter
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        Self::builder(config).build()
    }

    pub fn builder(config: CrawlerConfig) -> CrawlerBuilder {
        CrawlerBuilder {
            config,
            user_agent: UserAgentConfig::default(),
            filter: Arc::new(AcceptAll),
        }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.inner.config
    }

    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CrawlEvent) {
        match &event {
            CrawlEvent::Warn { message } => tracing::warn!("{}", message),
            CrawlEvent::Error { url, error } => tracing::error!("Error processing {}: {}", url, error),
            CrawlEvent::DisallowUrl { url, reason } => tracing::debug!("Disallowed {} ({})", url, reason),
            other => tracing::trace!("Event {}", other.channel()),
        }
        self.inner.events.emit(&event);
    }

    /// Registers an event handler on `channel`
    pub fn on<F>(&self, channel: Channel, handler: F) -> SubscriptionId
    where
        F: Fn(&CrawlEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(channel, handler)
    }

    /// Removes an event handler; returns false if it was not registered
    pub fn off(&self, channel: Channel, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(channel, id)
    }

    pub fn state(&self) -> EngineState {
        self.inner.control.state()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.control.is_paused()
    }

    /// Starts a crawl session and runs it until the frontier is empty
    ///
    /// Calling `start` while a session is running is a no-op. A seed, when
    /// given, is validated before anything else happens and is enqueued
    /// without consulting the URL filter.
    ///
    /// After a `stop`, a new `start` continues with the remaining frontier
    /// and the retained visited set. It waits for the stopped loop to reach
    /// its iteration boundary first, so two loops never run at once.
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::InvalidUrl` if the seed is not an absolute
    /// http(s) URL. The engine stays idle in that case.
    pub async fn start(&self, seed: Option<&str>) -> Result<(), CrawlError> {
        if self.state().is_active() {
            tracing::debug!("Crawl already running, ignoring start");
            return Ok(());
        }

        let seed = match seed.map(str::trim) {
            Some(seed) => {
                parse_crawlable(seed).map_err(|e| CrawlError::invalid_url(seed, e))?;
                Some(seed)
            }
            None => None,
        };

        let Some(session) = self.inner.control.begin() else {
            return Ok(());
        };

        tracing::info!("Crawl session {} started", session);
        self.emit(CrawlEvent::Start);

        if let Some(seed) = seed {
            self.enqueue(seed, false).await;
        }

        let _running = self.inner.run_lock.lock().await;
        self.run_loop(session).await;
        Ok(())
    }

    /// Suspends the loop before its next URL; ignored while idle
    pub fn pause(&self) {
        if self.inner.control.pause() {
            tracing::info!("Crawl paused");
            self.emit(CrawlEvent::Pause);
        }
    }

    /// Lets a paused loop continue; ignored unless paused
    pub fn resume(&self) {
        if self.inner.control.resume() {
            tracing::info!("Crawl resumed");
            self.emit(CrawlEvent::Resume);
        }
    }

    /// Forces the engine to Idle and emits `stop`, even when already idle
    ///
    /// An in-flight request is not cancelled; the loop exits once it reaches
    /// its next iteration boundary.
    pub fn stop(&self) {
        if self.inner.control.stop() {
            tracing::info!("Crawl stopped");
        } else {
            tracing::debug!("Stop requested while idle");
        }
        self.emit(CrawlEvent::Stop);
    }

    /// Adds a URL to the frontier, subject to dedup and the URL filter
    ///
    /// Returns true if the URL was added.
    pub async fn add_url(&self, url: &str) -> bool {
        self.enqueue(url.trim(), true).await
    }

    /// Copies the current frontier and visited set
    pub fn snapshot(&self) -> CrawlSnapshot {
        self.scheduler().snapshot()
    }

    /// Replaces the frontier and visited set; refused while a session runs
    pub fn restore(&self, snapshot: CrawlSnapshot) -> bool {
        if self.state().is_active() {
            tracing::warn!("Cannot restore a snapshot while crawling");
            return false;
        }
        tracing::info!(
            "Restoring {} queued and {} visited URLs",
            snapshot.frontier.len(),
            snapshot.visited.len()
        );
        self.scheduler().restore(snapshot);
        true
    }

    pub fn frontier_len(&self) -> usize {
        self.scheduler().frontier_len()
    }

    pub fn visited_len(&self) -> usize {
        self.scheduler().visited_len()
    }

    /// Returns the cached configuration of a host (`host` or `host:port`)
    pub fn domain_config(&self, host: &str) -> Option<Arc<DomainConfig>> {
        self.inner.domains.get(host)
    }

    /// Dedup-aware enqueue shared by seeds, sitemaps and extracted links
    async fn enqueue(&self, url: &str, apply_filter: bool) -> bool {
        if url.is_empty() {
            return false;
        }

        let known = self.scheduler().contains(url);
        if known {
            return false;
        }

        if apply_filter && !self.inner.filter.accept(url).await {
            tracing::trace!("Filter rejected {}", url);
            return false;
        }

        let added = self.scheduler().push_unique(url);
        if added {
            self.emit(CrawlEvent::AddUrl {
                url: url.to_string(),
            });
        }
        added
    }

    async fn run_loop(&self, session: SessionId) {
        let delay = self.inner.config.politeness_delay();

        loop {
            if !self.wait_while_paused(session, delay).await {
                tracing::debug!("Crawl session {} ended by stop", session);
                return;
            }

            let next = self.scheduler().pop();
            let Some(url) = next else {
                if self.inner.control.finish(session) {
                    tracing::info!(
                        "Crawl session {} finished, {} URLs visited",
                        session,
                        self.visited_len()
                    );
                    self.emit(CrawlEvent::Finish);
                }
                return;
            };

            if self.process_url(&url).await == Step::Attempted {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Sleeps while paused; returns false once `session` is no longer running
    async fn wait_while_paused(&self, session: SessionId, delay: Duration) -> bool {
        loop {
            if !self.inner.control.is_current(session) {
                return false;
            }
            if !self.inner.control.is_paused() {
                return true;
            }
            tokio::time::sleep(delay.max(PAUSE_POLL_FLOOR)).await;
        }
    }

    async fn process_url(&self, url: &str) -> Step {
        let first_visit = self.scheduler().mark_visited(url);
        if !first_visit {
            self.emit(CrawlEvent::SkipUrl {
                url: url.to_string(),
            });
            return Step::Skipped;
        }

        if !self.inner.filter.accept(url).await {
            self.emit(CrawlEvent::FilterUrl {
                url: url.to_string(),
            });
            return Step::Skipped;
        }

        let parsed = match parse_crawlable(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.emit(CrawlEvent::Error {
                    url: url.to_string(),
                    error: CrawlError::invalid_url(url, e),
                });
                return Step::Skipped;
            }
        };

        let lookup = match self
            .inner
            .domains
            .get_or_create(&parsed, &self.inner.fetcher, &self.inner.events)
            .await
        {
            Ok(lookup) => lookup,
            Err(error) => {
                self.emit(CrawlEvent::Error {
                    url: url.to_string(),
                    error,
                });
                return Step::Skipped;
            }
        };

        for discovered in &lookup.discovered {
            self.enqueue(discovered.trim(), true).await;
        }
        let domain = lookup.config;

        let honor_bot_rules = self.inner.config.honor_bot_rules;

        if honor_bot_rules && !robots::is_allowed(&domain.robots, parsed.path()) {
            self.emit(CrawlEvent::DisallowUrl {
                url: url.to_string(),
                reason: DisallowReason::BotRules,
            });
            return Step::Skipped;
        }

        self.emit(CrawlEvent::BeforeCrawl {
            url: url.to_string(),
        });

        let page = match self.inner.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(error) => {
                self.emit(CrawlEvent::Error {
                    url: url.to_string(),
                    error,
                });
                return Step::Attempted;
            }
        };

        if page.final_url != page.url {
            tracing::debug!("{} redirected to {}", page.url, page.final_url);
        }

        self.emit(CrawlEvent::Fetch {
            url: url.to_string(),
            status: page.status,
            headers: page.headers.clone(),
        });

        if !page.is_success() {
            self.emit(CrawlEvent::Error {
                url: url.to_string(),
                error: CrawlError::HttpStatus {
                    url: url.to_string(),
                    status: page.status,
                },
            });
            return Step::Attempted;
        }

        if honor_bot_rules && page.header(ROBOTS_HEADER).is_some_and(is_noindex) {
            self.emit(CrawlEvent::DisallowUrl {
                url: url.to_string(),
                reason: DisallowReason::ResponseHeader,
            });
            return Step::Attempted;
        }

        if parsed.path().to_ascii_lowercase().ends_with(".css") {
            let links = extract_css_urls(&page.body, url);
            for link in &links {
                self.enqueue(link, true).await;
            }
            tracing::info!("Crawled stylesheet {} ({} references)", url, links.len());
            self.emit(CrawlEvent::AfterCrawl(CrawledPage {
                url: url.to_string(),
                status: page.status,
                headers: page.headers,
                body: page.body,
                title: None,
                links,
            }));
            return Step::Attempted;
        }

        let parsed_page = match parse_page(url, page.content_type(), &page.body) {
            Ok(parsed_page) => parsed_page,
            Err(error) => {
                self.emit(CrawlEvent::Error {
                    url: url.to_string(),
                    error,
                });
                return Step::Attempted;
            }
        };

        if honor_bot_rules && parsed_page.noindex {
            self.emit(CrawlEvent::DisallowUrl {
                url: url.to_string(),
                reason: DisallowReason::MetaTag,
            });
            return Step::Attempted;
        }

        if self.inner.config.only_follow_sitemap && domain.has_sitemap() {
            tracing::trace!("Not following links on {}: host has a sitemap", url);
        } else {
            for link in &parsed_page.links {
                self.enqueue(link, true).await;
            }
        }

        tracing::info!("Crawled URL: {}", url);
        self.emit(CrawlEvent::AfterCrawl(CrawledPage {
            url: url.to_string(),
            status: page.status,
            headers: page.headers,
            body: page.body,
            title: parsed_page.title,
            links: parsed_page.links,
        }));

        Step::Attempted
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .field("events", &self.inner.events)
            .finish()
    }
}
