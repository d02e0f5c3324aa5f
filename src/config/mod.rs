//! Configuration module for Driftnet
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key is optional; `Config::default()` is a usable
//! configuration with no seeds.
//!
//! # Example
//!
//! ```no_run
//! use driftnet::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("driftnet.toml")).unwrap();
//! println!("Crawler will wait {}ms between pages", config.crawler.delay);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FilterConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
