//! index-mirror main entry point
//!
//! This is the command-line interface for the index-mirror directory mirror.

use anyhow::Context;
use clap::Parser;
use index_mirror::config::{load_config_with_hash, Config};
use index_mirror::crawler::Mirror;
use index_mirror::state::log_summary;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// index-mirror: mirror an HTTP directory listing onto local disk
///
/// index-mirror walks a static file index, recursing into every
/// subdirectory under the configured root and downloading each file once.
/// Files that already exist locally are skipped, so an interrupted mirror
/// can simply be run again.
#[derive(Parser, Debug)]
#[command(name = "index-mirror")]
#[command(version)]
#[command(about = "Mirror an HTTP directory listing onto local disk", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be mirrored without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Do not draw per-file progress bars
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.no_progress || cli.quiet {
        config.crawler.show_progress = false;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    handle_mirror(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("index_mirror=info,warn"),
            1 => EnvFilter::new("index_mirror=debug,info"),
            2 => EnvFilter::new("index_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== index-mirror Dry Run ===\n");

    println!("Mirror:");
    println!("  Root URL: {}", config.mirror.root_url);
    println!("  Destination: {}", config.mirror.destination.display());

    println!("\nCrawler:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout);
    println!("  Progress bars: {}", config.crawler.show_progress);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms ({:?}, max {}ms)",
        config.retry.backoff, config.retry.strategy, config.retry.max_backoff
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\n✓ Configuration is valid");
}

/// Handles the main mirror operation
///
/// Ctrl-C stops the run between tasks. The exit code is non-zero if the run
/// was interrupted or any listing or file could not be fetched.
async fn handle_mirror(config: Config) -> anyhow::Result<ExitCode> {
    let mut mirror = Mirror::new(config).context("failed to start mirror")?;

    let cancel = mirror.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing running tasks");
            cancel.cancel();
        }
    });

    tracing::info!("Starting download process...");
    let summary = mirror.run().await.context("mirror failed")?;
    tracing::info!("Download process completed.");
    log_summary(&summary);

    if summary.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
