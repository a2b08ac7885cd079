//! Fetch tasks
//!
//! One task is spawned per scheduled URL. A task waits for a gate slot,
//! announces the visit on the [`VisitLog`], runs the fetch, gives the slot back and
//! reports to the coordinator. Exactly one report is delivered per task, even
//! when the task is cancelled or unwinds, so the coordinator's count of
//! outstanding work always drains.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::gate::FetchGate;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// A URL scheduled for fetching, with the depth it was scheduled at
///
/// Without a depth cap this is the depth of the first page found linking to
/// the URL. Depth-capped crawls advance one level at a time, so there it is
/// the shortest link distance from the seeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub depth: u32,
}

/// Links discovered together, all sitting at the same depth
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkBatch {
    pub depth: u32,
    pub links: Vec<String>,
}

/// How a fetch task ended
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched,
    Failed(FetchError),
    Cancelled,
    /// The task unwound before reporting
    Aborted,
}

/// What a finished fetch task sends back
#[derive(Debug)]
pub struct FetchReport {
    pub url: String,
    pub outcome: FetchOutcome,
    pub batch: LinkBatch,
}

/// Message consumed by the coordinator loop
#[derive(Debug)]
pub enum Delivery {
    Seeds(LinkBatch),
    Report(FetchReport),
}

/// Where the one-line-per-visit progress output goes
///
/// The default writes each URL on its own line to stdout.
#[derive(Clone)]
pub struct VisitLog {
    sink: Arc<dyn Fn(&str) + Send + Sync>,
}

impl VisitLog {
    /// Writes visited URLs to stdout
    pub fn stdout() -> Self {
        Self::from_fn(|url| {
            // A closed stdout must not take the task down with it
            let _ = writeln!(std::io::stdout().lock(), "{}", url);
        })
    }

    /// Hands each visited URL to `sink`
    pub fn from_fn(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    fn announce(&self, url: &str) {
        (self.sink)(url);
    }
}

impl Default for VisitLog {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for VisitLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitLog").finish_non_exhaustive()
    }
}

/// Everything a fetch task needs, cloned into each spawned task
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub gate: FetchGate,
    pub deliveries: UnboundedSender<Delivery>,
    pub cancel: CancellationToken,
    pub settings: Arc<CrawlerConfig>,
    pub visits: VisitLog,
}

/// Delivers the task's report; delivers an `Aborted` report if dropped unused
struct ReportSlot {
    item: Option<WorkItem>,
    deliveries: UnboundedSender<Delivery>,
}

impl ReportSlot {
    fn new(item: WorkItem, deliveries: UnboundedSender<Delivery>) -> Self {
        Self {
            item: Some(item),
            deliveries,
        }
    }

    fn deliver(mut self, outcome: FetchOutcome, links: Vec<String>) {
        if let Some(item) = self.item.take() {
            send_report(&self.deliveries, item, outcome, links);
        }
    }
}

impl Drop for ReportSlot {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            send_report(&self.deliveries, item, FetchOutcome::Aborted, Vec::new());
        }
    }
}

fn send_report(
    deliveries: &UnboundedSender<Delivery>,
    item: WorkItem,
    outcome: FetchOutcome,
    links: Vec<String>,
) {
    let report = FetchReport {
        batch: LinkBatch {
            depth: item.depth.saturating_add(1),
            links,
        },
        url: item.url,
        outcome,
    };

    if deliveries.send(Delivery::Report(report)).is_err() {
        tracing::trace!("Coordinator is gone, dropping fetch report");
    }
}

/// Runs one fetch task to completion
pub(crate) async fn run_fetch_task(ctx: TaskContext, item: WorkItem) {
    let slot = ReportSlot::new(item.clone(), ctx.deliveries.clone());
    let (outcome, links) = fetch_with_retries(&ctx, &item.url).await;
    slot.deliver(outcome, links);
}

async fn fetch_with_retries(ctx: &TaskContext, url: &str) -> (FetchOutcome, Vec<String>) {
    let mut attempt = 0;

    loop {
        let permit = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return (FetchOutcome::Cancelled, Vec::new()),
            permit = ctx.gate.acquire() => match permit {
                Some(permit) => permit,
                None => return (FetchOutcome::Cancelled, Vec::new()),
            },
        };

        if attempt == 0 {
            ctx.visits.announce(url);
        }

        let result = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return (FetchOutcome::Cancelled, Vec::new()),
            result = ctx.fetcher.fetch(url) => result,
        };
        drop(permit);

        match result {
            Ok(links) => return (FetchOutcome::Fetched, links),
            Err(err) if err.is_transient() && attempt < ctx.settings.max_retries => {
                let delay = ctx.settings.retry_backoff(attempt);
                tracing::debug!("Retrying {} in {:?} after: {}", url, delay, err);
                attempt += 1;

                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => return (FetchOutcome::Cancelled, Vec::new()),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(err) => {
                tracing::warn!("{}", err);
                return (FetchOutcome::Failed(err), Vec::new());
            }
        }
    }
}
