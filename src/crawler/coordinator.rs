//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator is the single owner of the crawl's bookkeeping:
//! - The set of URLs already scheduled
//! - The count of outstanding work (batches not yet delivered back)
//! - Dispatching one fetch task per newly seen URL
//! - Detecting when the traversal is complete
//!
//! Fetch tasks never touch this state. They send their link batches over a
//! channel, and the coordinator handles one delivery at a time, so no locks
//! are needed.
//!
//! Counting works on deliveries: the seed batch counts as one unit, and every
//! dispatched task adds one unit that it pays back with exactly one report.
//! When the count drops to zero no task is running and none can be started,
//! so the crawl is finished.
//!
//! With a depth cap the coordinator advances one level at a time. Batches are
//! held back until every task of the current level has reported, so each URL
//! is scheduled at its shortest distance from the seeds and the visited set
//! does not depend on which branch answered first.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::gate::FetchGate;
use crate::crawler::seen::SeenSet;
use crate::crawler::summary::{CrawlSummary, FailedFetch};
use crate::crawler::task::{
    run_fetch_task, Delivery, FetchOutcome, FetchReport, LinkBatch, TaskContext, VisitLog,
    WorkItem,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const PROGRESS_INTERVAL: usize = 100;

/// Main crawler coordinator structure
pub struct Coordinator {
    fetcher: Arc<dyn Fetcher>,
    gate: FetchGate,
    settings: Arc<CrawlerConfig>,
    cancel: CancellationToken,
    visits: VisitLog,
}

/// Why an unseen link was not scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusal {
    Cancelled,
    TooDeep,
    UrlLimit,
}

/// Mutable state of one traversal, touched only by the coordinator loop
struct Worklist {
    seen: SeenSet,
    outstanding: usize,
    /// Batches for the next level of a depth-capped crawl
    deferred: Vec<LinkBatch>,
    summary: CrawlSummary,
}

impl Coordinator {
    /// Creates a coordinator that fetches through `fetcher`
    ///
    /// The concurrency limit and the optional caps come from `settings`.
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: &CrawlerConfig) -> Self {
        Self {
            fetcher,
            gate: FetchGate::new(settings.concurrency),
            settings: Arc::new(settings.clone()),
            cancel: CancellationToken::new(),
            visits: VisitLog::default(),
        }
    }

    /// Uses `cancel` to stop the crawl early
    ///
    /// Once the token fires nothing new is scheduled, and running tasks give
    /// up at their next wait point. The crawl still returns normally.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sends the one-line-per-visit output to `visits` instead of stdout
    pub fn with_visit_log(mut self, visits: VisitLog) -> Self {
        self.visits = visits;
        self
    }

    /// Runs the crawl from `seeds` until no work remains
    pub async fn run(self, seeds: Vec<String>) -> CrawlSummary {
        let start_time = Instant::now();
        let (deliveries, mut inbox) = mpsc::unbounded_channel();
        let ctx = TaskContext {
            fetcher: self.fetcher.clone(),
            gate: self.gate.clone(),
            deliveries,
            cancel: self.cancel.clone(),
            settings: self.settings.clone(),
            visits: self.visits.clone(),
        };
        let levelled = self.settings.max_depth.is_some();

        tracing::info!(
            "Starting crawl with {} seed URLs, {} concurrent fetches",
            seeds.len(),
            self.gate.capacity()
        );

        let mut worklist = Worklist {
            seen: SeenSet::new(),
            outstanding: 1,
            deferred: Vec::new(),
            summary: CrawlSummary::start(),
        };
        // Cannot fail: the receiver is alive right here
        let _ = ctx.deliveries.send(Delivery::Seeds(LinkBatch {
            depth: 0,
            links: seeds,
        }));

        let mut gate_closed = false;
        while worklist.outstanding > 0 {
            let delivery = tokio::select! {
                biased;
                _ = self.cancel.cancelled(), if !gate_closed => {
                    tracing::info!(
                        "Crawl cancelled, draining {} outstanding batches",
                        worklist.outstanding
                    );
                    // Tasks still queued at the gate give up right away
                    self.gate.close();
                    gate_closed = true;
                    continue;
                }
                delivery = inbox.recv() => delivery,
            };
            let Some(delivery) = delivery else {
                tracing::error!(
                    "Delivery channel closed with {} batches outstanding",
                    worklist.outstanding
                );
                break;
            };
            worklist.outstanding -= 1;

            let batch = match delivery {
                Delivery::Seeds(batch) => batch,
                Delivery::Report(report) => self.record_report(&mut worklist, report, start_time),
            };

            if !levelled {
                self.dispatch(&mut worklist, &ctx, batch);
                continue;
            }

            worklist.deferred.push(batch);
            if worklist.outstanding == 0 {
                let level = std::mem::take(&mut worklist.deferred);
                if let Some(first) = level.first() {
                    tracing::debug!("Advancing to depth {}", first.depth);
                }
                for batch in level {
                    self.dispatch(&mut worklist, &ctx, batch);
                }
            }
        }

        let mut summary = worklist.summary;
        summary.cancelled = self.cancel.is_cancelled();
        summary.elapsed = start_time.elapsed();

        tracing::info!(
            "Crawl completed: {} URLs scheduled, {} failed in {:?}",
            summary.scheduled_count(),
            summary.failure_count(),
            summary.elapsed
        );

        summary
    }

    /// Schedules every unseen link of `batch` that passes the caps
    fn dispatch(&self, worklist: &mut Worklist, ctx: &TaskContext, batch: LinkBatch) {
        for url in batch.links {
            if worklist.seen.contains(&url) {
                continue;
            }

            if let Some(refusal) = self.refuse(worklist, batch.depth) {
                tracing::trace!("Not scheduling {} ({:?})", url, refusal);
                worklist.summary.skipped_links += 1;
                continue;
            }

            worklist.seen.mark(&url);
            worklist.outstanding += 1;
            worklist.summary.scheduled.push(url.clone());
            tokio::spawn(run_fetch_task(
                ctx.clone(),
                WorkItem {
                    url,
                    depth: batch.depth,
                },
            ));
        }
    }

    /// Decides whether an unseen link at `depth` may be scheduled
    fn refuse(&self, worklist: &Worklist, depth: u32) -> Option<Refusal> {
        if self.cancel.is_cancelled() {
            return Some(Refusal::Cancelled);
        }

        if matches!(self.settings.max_depth, Some(max) if depth > max) {
            return Some(Refusal::TooDeep);
        }

        if matches!(self.settings.max_urls, Some(max) if worklist.seen.len() >= max) {
            return Some(Refusal::UrlLimit);
        }

        None
    }

    /// Folds a task report into the summary and returns its link batch
    fn record_report(
        &self,
        worklist: &mut Worklist,
        report: FetchReport,
        start_time: Instant,
    ) -> LinkBatch {
        let summary = &mut worklist.summary;

        match report.outcome {
            FetchOutcome::Fetched => summary.succeeded += 1,
            FetchOutcome::Failed(err) => summary.failures.push(FailedFetch {
                url: report.url,
                kind: Some(err.kind()),
                reason: err.to_string(),
            }),
            FetchOutcome::Cancelled => summary.cancelled_fetches += 1,
            FetchOutcome::Aborted => {
                tracing::warn!("Fetch task for {} aborted", report.url);
                summary.failures.push(FailedFetch {
                    url: report.url,
                    kind: None,
                    reason: "fetch task aborted".to_string(),
                });
            }
        }

        let finished = summary.succeeded + summary.failures.len();
        if finished > 0 && finished % PROGRESS_INTERVAL == 0 {
            let rate = finished as f64 / start_time.elapsed().as_secs_f64();
            tracing::info!(
                "Progress: {} pages fetched, {} outstanding, {} free fetch slots, {:.2} pages/sec",
                finished,
                worklist.outstanding,
                self.gate.available(),
                rate
            );
        }

        report.batch
    }
}
