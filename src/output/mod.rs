//! Output module for crawl reporting
//!
//! This module handles:
//! - Counting engine events as a crawl runs
//! - Rendering live and stored statistics to the console

pub mod stats;

pub use stats::{print_statistics, print_stored_statistics, CrawlStatistics, CrawlStats};
