//! Robots.txt handling module
//!
//! This module parses robots.txt documents into per-agent allow/disallow
//! rules and collects the sitemap URLs they declare. Fetching the document
//! is the domain configuration cache's job (see `crawler::domains`).

mod parser;
mod pattern;

pub use parser::{RobotsPolicy, RuleSet, WILDCARD_AGENT};
pub use pattern::PathPattern;

/// Checks if a path is allowed for the anonymous `*` agent
///
/// The crawl loop always evaluates policy under this identity, never under
/// its own user-agent name.
///
/// # Arguments
///
/// * `policy` - The parsed robots.txt policy
/// * `path` - The URL path to check
///
/// # Returns
///
/// * `true` - If the path may be fetched
/// * `false` - If a disallow rule matches and no allow rule does
pub fn is_allowed(policy: &RobotsPolicy, path: &str) -> bool {
    policy.is_allowed(WILDCARD_AGENT, path)
}
