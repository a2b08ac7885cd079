//! Ripple-Crawl main entry point
//!
//! This is the command-line interface for the Ripple-Crawl web crawler.

use anyhow::Context;
use clap::Parser;
use ripple_crawl::config::{load_config_with_hash, Config};
use ripple_crawl::crawler::crawl;
use ripple_crawl::output::print_statistics;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ripple-Crawl: a bounded-concurrency breadth-first web crawler
///
/// Visits every page reachable from the seed URLs exactly once and prints
/// each URL as its fetch begins. Fetch failures are reported on stderr and
/// never stop the crawl.
#[derive(Parser, Debug)]
#[command(name = "ripple-crawl")]
#[command(version)]
#[command(about = "A bounded-concurrency breadth-first web crawler", long_about = None)]
struct Cli {
    /// Seed URLs to start crawling from
    #[arg(value_name = "SEEDS")]
    seeds: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of fetches in flight
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Stop scheduling new URLs after this many
    #[arg(long)]
    max_urls: Option<usize>,

    /// Do not follow links deeper than this (seeds are depth 0)
    #[arg(long)]
    max_depth: Option<u32>,

    /// Retries for transient fetch failures
    #[arg(long)]
    retries: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Parse every successful response as HTML, whatever its Content-Type
    ///
    /// By default a response whose Content-Type header is present and not
    /// HTML counts as a failed fetch. Same as `accept-any-content-type = true`
    /// in the [http] section of the config file.
    #[arg(long)]
    accept_any_content_type: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output on stderr
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.crawler.concurrency = concurrency;
        }
        if let Some(max_urls) = self.max_urls {
            config.crawler.max_urls = Some(max_urls);
        }
        if let Some(max_depth) = self.max_depth {
            config.crawler.max_depth = Some(max_depth);
        }
        if let Some(retries) = self.retries {
            config.crawler.max_retries = retries;
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_secs = timeout;
        }
        if self.accept_any_content_type {
            config.http.accept_any_content_type = true;
        }
    }

    /// Builds the effective configuration: file (or defaults), then overrides
    ///
    /// Validation runs once, on the merged result.
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                let (config, hash) = load_config_with_hash(path)
                    .with_context(|| format!("loading configuration from {}", path.display()))?;
                tracing::info!("Configuration loaded successfully (hash: {})", hash);
                config
            }
            None => Config::default(),
        };
        self.apply_overrides(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = cli.resolve_config()?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let summary = crawl(&config, cli.seeds, cancel)
        .await
        .context("starting crawl")?;

    if !cli.quiet {
        print_statistics(&summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout only carries the visited URLs.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_crawl=info,warn"),
            1 => EnvFilter::new("ripple_crawl=debug,info"),
            2 => EnvFilter::new("ripple_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels the crawl on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupted, finishing in-flight work");
                cancel.cancel();
            }
            Err(e) => tracing::debug!("Could not listen for Ctrl-C: {}", e),
        }
    });
}
