//! Compiled robots.txt path patterns

use regex::Regex;
use std::fmt;

/// A single compiled `Allow`/`Disallow` rule
///
/// `*` matches any run of characters (non-greedy) and a trailing `$` anchors
/// the rule to the end of the path. Every other character, `.` included, is
/// matched literally. Matching is a substring search: a rule matches a path
/// if it occurs anywhere in it.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    /// Compiles a rule value into a pattern
    ///
    /// Returns `None` for a blank rule.
    pub fn compile(rule: &str) -> Option<Self> {
        let rule = rule.trim();
        if rule.is_empty() {
            return None;
        }

        let (body, anchored) = match rule.strip_suffix('$') {
            Some(body) => (body, true),
            None => (rule, false),
        };

        let mut expr = body
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*?");

        if anchored {
            expr.push('$');
        }

        match Regex::new(&expr) {
            Ok(regex) => Some(Self {
                source: rule.to_string(),
                regex,
            }),
            Err(e) => {
                tracing::debug!("Ignoring robots rule '{}': {}", rule, e);
                None
            }
        }
    }

    /// Returns true if the rule occurs anywhere in `path`
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The rule as written in the robots document
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathPattern {}
