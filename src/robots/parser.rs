//! Robots.txt parser implementation
//!
//! The grammar is line oriented. Comment lines are dropped first, then each
//! `key: value` line is matched case-insensitively against `User-agent`,
//! `Allow`, `Disallow` and `Sitemap`. Anything else is ignored.

use crate::robots::pattern::PathPattern;
use std::collections::HashMap;

/// Agent name whose rules apply to every bot without rules of its own
pub const WILDCARD_AGENT: &str = "*";

/// The allow/disallow rules registered for one user agent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub allow: Vec<PathPattern>,
    pub disallow: Vec<PathPattern>,
}

/// Parsed robots.txt policy
///
/// Maps agent names (case-sensitive, as written) to their rule sets and keeps
/// the `Sitemap` URLs declared anywhere in the document, in encounter order.
/// The default policy has no rules and therefore allows everything.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    rules: HashMap<String, RuleSet>,
    sitemap_urls: Vec<String>,
}

enum Directive {
    UserAgent,
    Allow,
    Disallow,
    Sitemap,
}

impl Directive {
    fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "user-agent" => Some(Self::UserAgent),
            "allow" => Some(Self::Allow),
            "disallow" => Some(Self::Disallow),
            "sitemap" => Some(Self::Sitemap),
            _ => None,
        }
    }
}

impl RobotsPolicy {
    /// Creates a permissive policy that allows everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses raw robots.txt content
    ///
    /// Parsing never fails; malformed or unknown lines are skipped.
    /// `Allow`/`Disallow` lines before the first `User-agent`, or after an
    /// empty `User-agent:` line, are ignored. Naming an agent again discards
    /// its earlier rules. `Sitemap` lines are accepted anywhere. A rule value
    /// may hold several comma-separated patterns.
    ///
    /// # Example
    ///
    /// ```
    /// use driftnet::robots::RobotsPolicy;
    ///
    /// let policy = RobotsPolicy::parse("User-agent: *\nDisallow: /private/\nSitemap: https://example.com/sitemap.xml");
    /// assert!(!policy.is_allowed("*", "/private/page"));
    /// assert!(policy.is_allowed("*", "/public"));
    /// assert_eq!(policy.sitemap_urls(), ["https://example.com/sitemap.xml"]);
    /// ```
    pub fn parse(raw: &str) -> Self {
        let mut policy = Self::default();
        let mut agent: Option<String> = None;

        for line in raw.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let Some(directive) = Directive::from_key(key) else {
                continue;
            };
            let value = strip_inline_comment(value).trim();

            match directive {
                Directive::UserAgent => {
                    if value.is_empty() {
                        agent = None;
                        continue;
                    }
                    policy.rules.insert(value.to_string(), RuleSet::default());
                    agent = Some(value.to_string());
                }
                Directive::Allow | Directive::Disallow => {
                    let Some(rules) = agent.as_ref().and_then(|a| policy.rules.get_mut(a)) else {
                        continue;
                    };
                    let patterns = value.split(',').filter_map(PathPattern::compile);
                    if matches!(directive, Directive::Allow) {
                        rules.allow.extend(patterns);
                    } else {
                        rules.disallow.extend(patterns);
                    }
                }
                Directive::Sitemap => {
                    if !value.is_empty() {
                        policy.sitemap_urls.push(value.to_string());
                    }
                }
            }
        }

        policy
    }

    /// Checks whether `agent` may fetch `path`
    ///
    /// The agent's own rules are used when present, otherwise those of `*`,
    /// otherwise everything is allowed. Any matching `Allow` rule wins,
    /// regardless of where it appeared relative to the `Disallow` rules.
    pub fn is_allowed(&self, agent: &str, path: &str) -> bool {
        let Some(rules) = self.rules_for(agent) else {
            return true;
        };

        if rules.allow.iter().any(|p| p.is_match(path)) {
            return true;
        }

        !rules.disallow.iter().any(|p| p.is_match(path))
    }

    /// Returns the effective rule set for `agent`, falling back to `*`
    pub fn rules_for(&self, agent: &str) -> Option<&RuleSet> {
        self.rules
            .get(agent)
            .or_else(|| self.rules.get(WILDCARD_AGENT))
    }

    /// Sitemap URLs declared in the document
    pub fn sitemap_urls(&self) -> &[String] {
        &self.sitemap_urls
    }

    /// Names of all agents that have a rule set, sorted
    pub fn agents(&self) -> Vec<&str> {
        let mut agents: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        agents.sort_unstable();
        agents
    }

    /// Returns true if the document declared no agents at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn strip_inline_comment(value: &str) -> &str {
    match value.find('#') {
        Some(idx) => &value[..idx],
        None => value,
    }
}
