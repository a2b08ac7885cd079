//! Crawl statistics rendering
//!
//! Turns a [`CrawlSummary`] into the human-readable report printed when a
//! crawl ends.

use crate::crawler::CrawlSummary;
use std::io::{self, Write};

/// Writes the statistics for `summary` to `out`
pub fn write_statistics<W: Write>(summary: &CrawlSummary, out: &mut W) -> io::Result<()> {
    writeln!(out, "=== Crawl Statistics ===")?;
    writeln!(out)?;

    writeln!(out, "Overview:")?;
    writeln!(
        out,
        "  Started: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "  Duration: {:.2}s", summary.elapsed.as_secs_f64())?;
    writeln!(out, "  URLs scheduled: {}", summary.scheduled_count())?;
    writeln!(out, "  Fetched: {}", summary.succeeded)?;
    writeln!(out, "  Failed: {}", summary.failure_count())?;
    if summary.skipped_links > 0 {
        writeln!(out, "  Links skipped by limits: {}", summary.skipped_links)?;
    }
    if summary.cancelled {
        writeln!(
            out,
            "  Cancelled: yes ({} fetches abandoned)",
            summary.cancelled_fetches
        )?;
    }

    if !summary.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failures by Kind:")?;
        for (kind, count) in summary.failures_by_kind() {
            writeln!(out, "  {}: {}", kind, count)?;
        }

        writeln!(out)?;
        writeln!(out, "Could Not Fetch ({}):", summary.failure_count())?;
        for failure in &summary.failures {
            writeln!(out, "  - {}", failure.reason)?;
        }
    }

    let attempted = summary.succeeded + summary.failure_count();
    let success_rate = if attempted > 0 {
        (summary.succeeded as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };
    writeln!(out)?;
    writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} pages fetched)",
        success_rate, summary.succeeded, attempted
    )?;

    Ok(())
}

/// Prints the statistics to stderr, keeping stdout for visited URLs
pub fn print_statistics(summary: &CrawlSummary) {
    let stderr = io::stderr();
    if let Err(e) = write_statistics(summary, &mut stderr.lock()) {
        tracing::debug!("Could not print crawl statistics: {}", e);
    }
}
