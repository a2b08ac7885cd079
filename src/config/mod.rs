//! Configuration module for Ripple-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A configuration file is optional: [`Config::default`] describes the plain
//! crawler (20 concurrent fetches, no caps, no retries).
//!
//! # Example
//!
//! ```no_run
//! use ripple_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will run {} fetches at once", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, HttpConfig, UserAgentConfig, DEFAULT_CONCURRENCY};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

impl Config {
    /// Validates the configuration, e.g. after command-line overrides were applied
    pub fn validate(&self) -> crate::ConfigResult<()> {
        validation::validate(self)
    }
}
