//! URL handling module
//!
//! This module provides the URL resolver used to turn page-relative references
//! into absolute, dedup-able URL strings, the path-joining primitive it is
//! built on, host extraction for per-domain bookkeeping, and the wildcard
//! domain matching used by the configured host filter.

mod domain;
mod resolve;

pub use domain::{extract_domain, host_key, matches_wildcard, parse_crawlable};
pub use resolve::{normalized_join, resolve};
