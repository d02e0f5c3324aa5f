//! Frontier and visited-set bookkeeping
//!
//! This module handles:
//! - The FIFO frontier of URLs waiting to be fetched
//! - Dedup of new URLs against both the frontier and the visited set
//! - The append-only visited set
//! - Snapshots of both for an external persister

use std::collections::{HashSet, VecDeque};

/// A point-in-time copy of the crawl frontier and visited set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSnapshot {
    /// Pending URLs in dequeue order
    pub frontier: Vec<String>,

    /// URLs already dequeued, in the order they were first visited
    pub visited: Vec<String>,
}

/// Scheduler owns the frontier queue and the visited set
///
/// A URL is present in at most one of the two at a time, except after
/// [`Scheduler::restore`] with inconsistent input, which the crawl loop
/// handles by skipping the visited entry when it reaches the head of the
/// queue.
#[derive(Debug, Default)]
pub struct Scheduler {
    /// URLs waiting to be fetched, oldest first
    frontier: VecDeque<String>,

    /// Membership index for `frontier`
    queued: HashSet<String>,

    /// URLs that have been dequeued at least once
    visited: HashSet<String>,

    /// `visited` in insertion order
    visit_order: Vec<String>,
}

impl Scheduler {
    /// Creates an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `url` is queued or was already visited
    pub fn contains(&self, url: &str) -> bool {
        self.queued.contains(url) || self.visited.contains(url)
    }

    /// Appends `url` to the frontier unless it is already known
    ///
    /// # Returns
    ///
    /// * `true` - The URL was added
    /// * `false` - The URL was already queued or visited
    pub fn push_unique(&mut self, url: &str) -> bool {
        if self.contains(url) {
            return false;
        }
        self.queued.insert(url.to_string());
        self.frontier.push_back(url.to_string());
        true
    }

    /// Removes and returns the head of the frontier
    pub fn pop(&mut self) -> Option<String> {
        let url = self.frontier.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Records `url` as visited; returns false if it already was
    pub fn mark_visited(&mut self, url: &str) -> bool {
        if !self.visited.insert(url.to_string()) {
            return false;
        }
        self.visit_order.push(url.to_string());
        true
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Returns true if there is nothing left to fetch
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Copies the current frontier and visited set
    pub fn snapshot(&self) -> CrawlSnapshot {
        CrawlSnapshot {
            frontier: self.frontier.iter().cloned().collect(),
            visited: self.visit_order.clone(),
        }
    }

    /// Replaces all state with the contents of `snapshot`
    ///
    /// Duplicate frontier entries are dropped, keeping the first occurrence.
    /// Frontier entries that also appear in the visited list are kept; the
    /// crawl loop skips them when dequeued.
    pub fn restore(&mut self, snapshot: CrawlSnapshot) {
        *self = Self::new();
        for url in &snapshot.visited {
            self.mark_visited(url);
        }
        for url in snapshot.frontier {
            if self.queued.insert(url.clone()) {
                self.frontier.push_back(url);
            }
        }
    }
}
