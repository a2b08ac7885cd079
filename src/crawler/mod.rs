//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and link extraction
//! - The global fetch concurrency gate
//! - Deduplication of scheduled URLs
//! - Overall crawl coordination and termination detection

mod coordinator;
mod fetcher;
mod gate;
mod parser;
mod seen;
mod summary;
mod task;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, Fetcher, HttpFetcher};
pub use gate::{FetchGate, FetchPermit};
pub use parser::extract_links;
pub use seen::SeenSet;
pub use summary::{CrawlSummary, FailedFetch};
pub use task::{LinkBatch, VisitLog, WorkItem};

use crate::config::Config;
use crate::CrawlError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl over HTTP
///
/// Builds the HTTP fetcher from `config`, then visits every URL reachable from
/// `seeds` exactly once. Individual fetch failures are logged and collected
/// in the returned summary; they never make this function fail.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seeds` - Initial URLs, used verbatim
/// * `cancel` - Token that stops the crawl early when cancelled
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Traversal finished (or was cancelled)
/// * `Err(CrawlError)` - The HTTP client could not be built
///
/// # Example
///
/// ```no_run
/// use ripple_crawl::config::Config;
/// use ripple_crawl::crawler::crawl;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let seeds = vec!["https://example.com/".to_string()];
/// let summary = crawl(&Config::default(), seeds, CancellationToken::new()).await?;
/// println!("Scheduled {} pages", summary.scheduled_count());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    config: &Config,
    seeds: Vec<String>,
    cancel: CancellationToken,
) -> Result<CrawlSummary, CrawlError> {
    let fetcher = HttpFetcher::new(config)?;
    let summary = Coordinator::new(Arc::new(fetcher), &config.crawler)
        .with_cancellation(cancel)
        .run(seeds)
        .await;
    Ok(summary)
}
