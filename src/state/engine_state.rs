//! Engine state definitions for the crawl session
//!
//! The engine is either idle or crawling. While crawling it may additionally
//! be paused, which suspends the loop at its next iteration boundary.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifies one run of the crawl loop, from `start` to `stop` or `finish`
pub type SessionId = u64;

/// Represents the current state of the crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// No crawl loop is running
    Idle,

    /// The crawl loop is running
    Crawling,

    /// The crawl loop is running but suspended before its next URL
    Paused,
}

impl EngineState {
    /// Returns true if a crawl session is active (paused or not)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Crawling | Self::Paused)
    }

    /// Returns a short string representation for logs and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Crawling => "crawling",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Default)]
struct Flags {
    crawling: bool,
    paused: bool,
    session: SessionId,
}

/// Cooperative control flags for the crawl loop
///
/// Every transition happens under one lock, so a loop that observes the end
/// of its session can never mistake a newer session for its own.
#[derive(Debug, Default)]
pub struct EngineControl {
    flags: Mutex<Flags>,
}

impl EngineControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begins a new session
    ///
    /// # Returns
    ///
    /// * `Some(session)` - The engine moved from Idle to Crawling
    /// * `None` - A session is already running
    pub fn begin(&self) -> Option<SessionId> {
        let mut flags = self.lock();
        if flags.crawling {
            return None;
        }
        flags.crawling = true;
        flags.paused = false;
        flags.session += 1;
        Some(flags.session)
    }

    /// Forces the engine to Idle
    ///
    /// Returns true if a session was running.
    pub fn stop(&self) -> bool {
        let mut flags = self.lock();
        let was_crawling = flags.crawling;
        flags.crawling = false;
        flags.paused = false;
        was_crawling
    }

    /// Ends `session` because its frontier ran dry
    ///
    /// Returns false if the session was already stopped or superseded.
    pub fn finish(&self, session: SessionId) -> bool {
        let mut flags = self.lock();
        if !flags.crawling || flags.session != session {
            return false;
        }
        flags.crawling = false;
        flags.paused = false;
        true
    }

    /// Sets the paused flag; ignored while Idle or already paused
    pub fn pause(&self) -> bool {
        let mut flags = self.lock();
        if !flags.crawling || flags.paused {
            return false;
        }
        flags.paused = true;
        true
    }

    /// Clears the paused flag; ignored while Idle or not paused
    pub fn resume(&self) -> bool {
        let mut flags = self.lock();
        if !flags.crawling || !flags.paused {
            return false;
        }
        flags.paused = false;
        true
    }

    /// Returns true while `session` is the running session
    pub fn is_current(&self, session: SessionId) -> bool {
        let flags = self.lock();
        flags.crawling && flags.session == session
    }

    pub fn is_paused(&self) -> bool {
        let flags = self.lock();
        flags.crawling && flags.paused
    }

    pub fn state(&self) -> EngineState {
        let flags = self.lock();
        match (flags.crawling, flags.paused) {
            (false, _) => EngineState::Idle,
            (true, false) => EngineState::Crawling,
            (true, true) => EngineState::Paused,
        }
    }
}
