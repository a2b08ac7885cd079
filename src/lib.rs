//! Ripple-Crawl: a bounded-concurrency breadth-first web crawler
//!
//! Starting from a set of seed URLs, the crawler fetches each page, extracts
//! its outbound links and visits every newly discovered URL exactly once,
//! never running more than a fixed number of fetches at the same time.

pub mod config;
pub mod crawler;
pub mod output;

use thiserror::Error;

/// Main error type for Ripple-Crawl operations
///
/// Only setup failures end up here. Individual page fetches report through
/// [`crawler::FetchError`] and never abort a crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Ripple-Crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlSummary, FetchError, Fetcher, HttpFetcher};
