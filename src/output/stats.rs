//! Crawl statistics
//!
//! Live statistics are gathered by subscribing to every engine channel;
//! stored statistics are read back from the page database.

use crate::crawler::{Channel, CrawlEvent, Crawler, DisallowReason};
use crate::storage::{Storage, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Event counters for one or more crawl sessions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Number of events seen per channel
    pub events: HashMap<Channel, u64>,

    /// Number of `disallow-url` events per reason
    pub disallowed: HashMap<DisallowReason, u64>,

    /// Total bytes of page bodies delivered on `after-crawl`
    pub bytes_crawled: u64,
}

impl CrawlStatistics {
    /// Count for one channel
    pub fn count(&self, channel: Channel) -> u64 {
        self.events.get(&channel).copied().unwrap_or(0)
    }
}

/// Statistics collector driven by engine events
#[derive(Debug, Default)]
pub struct CrawlStats {
    counters: Mutex<CrawlStatistics>,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collector subscribed to every channel of `crawler`
    pub fn attach(crawler: &Crawler) -> Arc<Self> {
        let stats = Arc::new(Self::new());
        for channel in Channel::ALL {
            let stats = Arc::clone(&stats);
            crawler.on(channel, move |event| stats.record(event));
        }
        stats
    }

    /// Counts one event
    pub fn record(&self, event: &CrawlEvent) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        *counters.events.entry(event.channel()).or_insert(0) += 1;

        match event {
            CrawlEvent::DisallowUrl { reason, .. } => {
                *counters.disallowed.entry(*reason).or_insert(0) += 1;
            }
            CrawlEvent::AfterCrawl(page) => {
                counters.bytes_crawled += page.body.len() as u64;
            }
            _ => {}
        }
    }

    /// Copies the current counters
    pub fn snapshot(&self) -> CrawlStatistics {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Prints live statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    let crawled = stats.count(Channel::AfterCrawl);
    let fetched = stats.count(Channel::Fetch);

    println!("Overview:");
    println!("  URLs queued: {}", stats.count(Channel::AddUrl));
    println!("  Fetches: {}", fetched);
    println!("  Pages crawled: {}", crawled);
    println!("  Bytes crawled: {}", stats.bytes_crawled);
    println!("  Warnings: {}", stats.count(Channel::Warn));
    println!("  Errors: {}", stats.count(Channel::Error));
    println!();

    println!("Events by Channel:");
    for channel in Channel::ALL {
        let count = stats.count(channel);
        if count > 0 {
            println!("  {}: {}", channel, count);
        }
    }
    println!();

    if !stats.disallowed.is_empty() {
        println!("Disallowed:");
        let mut reasons: Vec<_> = stats.disallowed.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1).then(a.0.as_str().cmp(b.0.as_str())));
        for (reason, count) in reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    let success_rate = if fetched > 0 {
        (crawled as f64 / fetched as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Success Rate: {:.1}% ({} / {} fetches crawled)",
        success_rate, crawled, fetched
    );
}

/// Prints page counts from the database
pub fn print_stored_statistics(storage: &dyn Storage) -> StorageResult<()> {
    let total = storage.count_pages()?;
    let by_domain = storage.count_pages_by_domain()?;
    let snapshot = storage.load_snapshot()?;

    println!("=== Stored Pages ===\n");
    println!("  Total pages: {}", total);
    println!("  Unique domains: {}", by_domain.len());
    println!("  Saved frontier: {} pending, {} visited", snapshot.frontier.len(), snapshot.visited.len());
    println!();

    if !by_domain.is_empty() {
        println!("Pages by Domain:");
        for (domain, count) in by_domain {
            println!("  {}: {}", domain, count);
        }
    }

    Ok(())
}
