//! Crawl event channels and the subscriber registry
//!
//! Every observable step of the crawl loop is published as a [`CrawlEvent`]
//! on one named [`Channel`]. Handlers are plain synchronous closures; they
//! receive a shared reference to the event and must not expect to mutate
//! engine state through it.

use crate::CrawlError;
use reqwest::header::HeaderMap;
use scraper::Html;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Named event channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Start,
    Pause,
    Resume,
    Stop,
    Finish,
    Warn,
    Error,
    AddUrl,
    SkipUrl,
    FilterUrl,
    DisallowUrl,
    BeforeCrawl,
    Fetch,
    AfterCrawl,
}

impl Channel {
    /// Every channel, in lifecycle order
    pub const ALL: [Channel; 14] = [
        Channel::Start,
        Channel::Pause,
        Channel::Resume,
        Channel::Stop,
        Channel::Finish,
        Channel::Warn,
        Channel::Error,
        Channel::AddUrl,
        Channel::SkipUrl,
        Channel::FilterUrl,
        Channel::DisallowUrl,
        Channel::BeforeCrawl,
        Channel::Fetch,
        Channel::AfterCrawl,
    ];

    /// The channel's wire name, e.g. `"disallow-url"`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Finish => "finish",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::AddUrl => "add-url",
            Self::SkipUrl => "skip-url",
            Self::FilterUrl => "filter-url",
            Self::DisallowUrl => "disallow-url",
            Self::BeforeCrawl => "before-crawl",
            Self::Fetch => "fetch",
            Self::AfterCrawl => "after-crawl",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("Unknown event channel: {}", s))
    }
}

/// Why a URL was withheld from fetching or indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisallowReason {
    /// The domain's robots.txt disallows the path
    BotRules,

    /// The document carries `<meta name="robots" content="noindex">`
    MetaTag,

    /// The response carries an `X-Robots-Tag: noindex` header
    ResponseHeader,
}

impl DisallowReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BotRules => "DISALLOWED_BY_BOT_RULES",
            Self::MetaTag => "DISALLOWED_BY_META_TAG",
            Self::ResponseHeader => "DISALLOWED_BY_RESPONSE_HEADER",
        }
    }
}

impl fmt::Display for DisallowReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A page that was fetched and processed successfully
#[derive(Debug, Clone)]
pub struct CrawledPage {
    /// The URL as it was dequeued from the frontier
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Raw response body
    pub body: String,

    /// Document title, if any
    pub title: Option<String>,

    /// Absolute URLs extracted from the page, in document order
    pub links: Vec<String>,
}

impl CrawledPage {
    /// Parses the body into a document tree
    ///
    /// The tree is rebuilt on every call; keep the result if it is needed
    /// more than once.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// The `Content-Type` header value, if present and valid UTF-8
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// An event published by the crawl engine
#[derive(Debug)]
pub enum CrawlEvent {
    Start,
    Pause,
    Resume,
    Stop,
    Finish,
    Warn {
        message: String,
    },
    Error {
        url: String,
        error: CrawlError,
    },
    AddUrl {
        url: String,
    },
    SkipUrl {
        url: String,
    },
    FilterUrl {
        url: String,
    },
    DisallowUrl {
        url: String,
        reason: DisallowReason,
    },
    BeforeCrawl {
        url: String,
    },
    Fetch {
        url: String,
        status: u16,
        headers: HeaderMap,
    },
    AfterCrawl(CrawledPage),
}

impl CrawlEvent {
    /// The channel this event is published on
    pub fn channel(&self) -> Channel {
        match self {
            Self::Start => Channel::Start,
            Self::Pause => Channel::Pause,
            Self::Resume => Channel::Resume,
            Self::Stop => Channel::Stop,
            Self::Finish => Channel::Finish,
            Self::Warn { .. } => Channel::Warn,
            Self::Error { .. } => Channel::Error,
            Self::AddUrl { .. } => Channel::AddUrl,
            Self::SkipUrl { .. } => Channel::SkipUrl,
            Self::FilterUrl { .. } => Channel::FilterUrl,
            Self::DisallowUrl { .. } => Channel::DisallowUrl,
            Self::BeforeCrawl { .. } => Channel::BeforeCrawl,
            Self::Fetch { .. } => Channel::Fetch,
            Self::AfterCrawl(_) => Channel::AfterCrawl,
        }
    }

    /// The URL the event concerns, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Error { url, .. }
            | Self::AddUrl { url }
            | Self::SkipUrl { url }
            | Self::FilterUrl { url }
            | Self::DisallowUrl { url, .. }
            | Self::BeforeCrawl { url }
            | Self::Fetch { url, .. } => Some(url),
            Self::AfterCrawl(page) => Some(&page.url),
            _ => None,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&CrawlEvent) + Send + Sync>;

/// Observer registry keyed by channel
///
/// Dispatch is synchronous and in subscription order. A handler that panics
/// is logged and skipped; the remaining handlers still run and the panic
/// never reaches the crawl loop.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<Channel, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Channel, Vec<(SubscriptionId, Handler)>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handler` on `channel`
    pub fn subscribe<F>(&self, channel: Channel, handler: F) -> SubscriptionId
    where
        F: Fn(&CrawlEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(channel)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler; returns false if it was not registered on `channel`
    pub fn unsubscribe(&self, channel: Channel, id: SubscriptionId) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(&channel) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        before != list.len()
    }

    /// Number of handlers registered on `channel`
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.lock().get(&channel).map_or(0, Vec::len)
    }

    /// Publishes `event` to every handler on its channel
    ///
    /// Handlers are copied out of the registry before any of them runs, so a
    /// handler may subscribe or unsubscribe without deadlocking.
    ///
    /// # Returns
    ///
    /// The number of handlers that returned without panicking
    pub fn emit(&self, event: &CrawlEvent) -> usize {
        let channel = event.channel();
        let handlers: Vec<Handler> = match self.lock().get(&channel) {
            Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return 0,
        };

        let mut completed = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => completed += 1,
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    tracing::error!(
                        channel = channel.name(),
                        panic = %panic_msg,
                        "Event handler panicked"
                    );
                }
            }
        }
        completed
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&'static str, usize> = self
            .lock()
            .iter()
            .map(|(channel, list)| (channel.name(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
