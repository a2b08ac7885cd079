use crate::crawler::fetcher::FetchErrorKind;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// A URL that was scheduled but could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFetch {
    pub url: String,
    /// `None` when the fetch task died without producing an error
    pub kind: Option<FetchErrorKind>,
    pub reason: String,
}

/// Outcome of one crawl invocation
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,

    /// Every URL that was scheduled, in scheduling order
    pub scheduled: Vec<String>,

    /// Fetches that completed and yielded a link batch
    pub succeeded: usize,

    pub failures: Vec<FailedFetch>,

    /// Scheduled fetches abandoned because the crawl was cancelled
    pub cancelled_fetches: usize,

    /// Unseen links not scheduled because of a limit or cancellation
    pub skipped_links: usize,

    pub cancelled: bool,
}

impl CrawlSummary {
    pub(crate) fn start() -> Self {
        Self {
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            scheduled: Vec::new(),
            succeeded: 0,
            failures: Vec::new(),
            cancelled_fetches: 0,
            skipped_links: 0,
            cancelled: false,
        }
    }

    /// Number of distinct URLs handed to a fetch task
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Failure counts grouped by category; task aborts are listed as "aborted"
    pub fn failures_by_kind(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            let key = failure
                .kind
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "aborted".to_string());
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }
}
