//! Mirror coordinator - main traversal orchestration logic
//!
//! This module contains the main loop that coordinates the mirror:
//! - Seeding the frontier with the root directory
//! - Running directory and file tasks on a bounded pool
//! - Feeding entries discovered by directory tasks back into the frontier
//! - Stopping cleanly on cancellation
//! - Producing the run summary

use crate::config::Config;
use crate::crawler::downloader::{DownloadTask, Downloader};
use crate::crawler::fetcher::{build_http_client, PageFetcher};
use crate::crawler::parser::{extract_entries, EntryKind, EntryLink};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::scheduler::{CrawlTask, Scheduler};
use crate::state::{RunStats, RunSummary, VisitedSet};
use crate::url::{normalize_root, ScopeGuard};
use crate::MirrorError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// State shared by every running task
///
/// The visited sets are the only mutable state crossing task boundaries;
/// everything else is read-only or internally synchronized.
#[derive(Debug)]
pub struct MirrorContext {
    scope: ScopeGuard,
    destination: PathBuf,
    fetcher: PageFetcher,
    downloader: Downloader,
    visited_dirs: VisitedSet,
    claimed_files: VisitedSet,
    stats: RunStats,
    cancel: CancellationToken,
}

impl MirrorContext {
    /// Turns a listing entry into a task, or None if it must not be followed
    fn child_task(&self, entry: EntryLink) -> Option<CrawlTask> {
        if !self.scope.in_scope(&entry.url) {
            tracing::debug!("Ignoring out-of-scope entry {}", entry.url);
            return None;
        }

        let path = match self.scope.local_path(&self.destination, &entry.url) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Ignoring entry {:?}: {}", entry.name, e);
                return None;
            }
        };

        match entry.kind {
            EntryKind::Directory => {
                tracing::info!("Recursing into: {}", entry.url);
                Some(CrawlTask::Directory {
                    url: entry.url,
                    local_dir: path,
                })
            }
            EntryKind::File => Some(CrawlTask::File(DownloadTask {
                url: entry.url,
                path,
            })),
        }
    }
}

/// Main mirror coordinator structure
pub struct Mirror {
    ctx: Arc<MirrorContext>,
    scheduler: Scheduler,
}

impl Mirror {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated mirror configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Mirror)` - Ready to run
    /// * `Err(MirrorError)` - The root URL is invalid or the HTTP client could
    ///   not be built
    pub fn new(config: Config) -> Result<Self, MirrorError> {
        let root = normalize_root(&config.mirror.root_url)?;
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let retry = RetryPolicy::from_config(&config.retry);
        let request_timeout = Duration::from_secs(config.crawler.request_timeout);

        let destination = config.mirror.destination.clone();
        let scheduler = Scheduler::new(
            config.crawler.max_concurrent_requests as usize,
            vec![CrawlTask::Directory {
                url: root.clone(),
                local_dir: destination.clone(),
            }],
        );

        let ctx = MirrorContext {
            scope: ScopeGuard::new(root),
            destination,
            fetcher: PageFetcher::new(client.clone(), retry.clone(), request_timeout),
            downloader: Downloader::new(
                client,
                retry,
                request_timeout,
                config.crawler.show_progress,
            ),
            visited_dirs: VisitedSet::new(),
            claimed_files: VisitedSet::new(),
            stats: RunStats::new(),
            cancel: CancellationToken::new(),
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            scheduler,
        })
    }

    /// Token that interrupts the run between tasks when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// The normalized root URL being mirrored
    pub fn root(&self) -> &Url {
        self.ctx.scope.root()
    }

    /// The local directory mirroring the root URL
    pub fn destination(&self) -> &Path {
        &self.ctx.destination
    }

    /// Runs the mirror until the frontier drains or the run is cancelled
    ///
    /// Individual listing or download failures never abort the run; they are
    /// logged and counted in the returned summary. Only failing to create the
    /// destination root is fatal.
    pub async fn run(&mut self) -> Result<RunSummary, MirrorError> {
        let start_time = Instant::now();

        tokio::fs::create_dir_all(&self.ctx.destination)
            .await
            .map_err(|e| MirrorError::io(&self.ctx.destination, e))?;

        tracing::info!(
            "Mirroring {} into {} ({} concurrent requests)",
            self.ctx.scope.root(),
            self.ctx.destination.display(),
            self.scheduler.max_in_flight()
        );

        let mut running: JoinSet<Vec<CrawlTask>> = JoinSet::new();
        let mut tasks_completed: u64 = 0;

        loop {
            if self.ctx.cancel.is_cancelled() {
                if !self.scheduler.is_empty() {
                    let dropped = self.scheduler.clear_frontier();
                    tracing::warn!(
                        "Cancellation requested; {} queued tasks dropped, waiting for {} running",
                        dropped,
                        running.len()
                    );
                }
                self.ctx.stats.mark_cancelled();
            } else {
                while let Some(task) = self.scheduler.next_task(running.len()) {
                    tracing::debug!("Starting task for {}", task.url());
                    running.spawn(process_task(Arc::clone(&self.ctx), task));
                }
            }

            match running.join_next().await {
                None => break,
                Some(Ok(children)) => self.scheduler.extend_frontier(children),
                Some(Err(e)) => tracing::error!("Mirror task failed: {}", e),
            }

            tasks_completed += 1;
            if tasks_completed % 100 == 0 {
                tracing::info!(
                    "Progress: {} tasks done, {} queued, {} running",
                    tasks_completed,
                    self.scheduler.frontier_size(),
                    running.len()
                );
            }
        }

        let summary = self.ctx.stats.summary(start_time.elapsed());
        tracing::info!(
            "Mirror finished: {} directories, {} files in {:?}",
            summary.directories_entered,
            summary.files_downloaded + summary.files_skipped,
            summary.elapsed
        );

        Ok(summary)
    }
}

/// Runs one task and returns the tasks it discovered
async fn process_task(ctx: Arc<MirrorContext>, task: CrawlTask) -> Vec<CrawlTask> {
    match task {
        CrawlTask::Directory { url, local_dir } => descend(&ctx, url, &local_dir).await,
        CrawlTask::File(task) => {
            fetch_file(&ctx, task).await;
            Vec::new()
        }
    }
}

/// Lists one directory and returns tasks for its in-scope entries
///
/// The directory is marked visited before its listing is requested, so it is
/// entered at most once per run even if the request fails.
async fn descend(ctx: &MirrorContext, url: Url, local_dir: &Path) -> Vec<CrawlTask> {
    if !ctx.visited_dirs.insert(&url) {
        tracing::info!("Skipping already visited: {}", url);
        return Vec::new();
    }

    tracing::info!("Entering directory: {} -> {}", url, local_dir.display());
    ctx.stats.record_directory();

    let html = match ctx.fetcher.fetch(&url, &ctx.cancel).await {
        Ok(html) => html,
        Err(MirrorError::Cancelled) => {
            tracing::debug!("Listing of {} cancelled", url);
            return Vec::new();
        }
        Err(e) => {
            tracing::error!("Skipping link fetch for {}: {}", url, e);
            ctx.stats.record_listing_failure();
            return Vec::new();
        }
    };

    let entries = extract_entries(&html, &url, &ctx.scope);
    tracing::info!("Found {} valid links in {}", entries.len(), url);
    ctx.stats.record_links(entries.len());

    entries
        .into_iter()
        .filter_map(|entry| ctx.child_task(entry))
        .collect()
}

/// Downloads one file unless another listing already claimed it
async fn fetch_file(ctx: &MirrorContext, task: DownloadTask) {
    if !ctx.claimed_files.insert(&task.url) {
        tracing::debug!("Already handled: {}", task.url);
        return;
    }

    let outcome = ctx.downloader.download(&task, &ctx.cancel).await;
    if outcome.is_failure() && ctx.cancel.is_cancelled() {
        tracing::debug!("Download of {} interrupted by cancellation", task.url);
        return;
    }
    ctx.stats.record_download(&outcome);
}

/// Runs a complete mirror operation
///
/// # Example
///
/// ```no_run
/// use index_mirror::config::load_config;
/// use index_mirror::crawler::run_mirror;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("mirror.toml"))?;
/// let summary = run_mirror(config).await?;
/// println!("{} files downloaded", summary.files_downloaded);
/// # Ok(())
/// # }
/// ```
pub async fn run_mirror(config: Config) -> Result<RunSummary, MirrorError> {
    let mut mirror = Mirror::new(config)?;
    mirror.run().await
}
