//! Counters gathered during a mirror run

use crate::state::DownloadOutcome;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Live counters shared by every traversal task
#[derive(Debug, Default)]
pub struct RunStats {
    directories_entered: AtomicU64,
    listing_failures: AtomicU64,
    links_discovered: AtomicU64,
    files_downloaded: AtomicU64,
    files_skipped: AtomicU64,
    files_failed: AtomicU64,
    bytes_downloaded: AtomicU64,
    cancelled: AtomicBool,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_directory(&self) {
        self.directories_entered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_links(&self, links: usize) {
        self.links_discovered
            .fetch_add(links as u64, Ordering::Relaxed);
    }

    pub fn record_listing_failure(&self) {
        self.listing_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download(&self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Done { bytes } => {
                self.files_downloaded.fetch_add(1, Ordering::Relaxed);
                self.bytes_downloaded.fetch_add(*bytes, Ordering::Relaxed);
            }
            DownloadOutcome::Skipped => {
                self.files_skipped.fetch_add(1, Ordering::Relaxed);
            }
            DownloadOutcome::Failed { .. } => {
                self.files_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot once the run has finished
    pub fn summary(&self, elapsed: Duration) -> RunSummary {
        RunSummary {
            directories_entered: self.directories_entered.load(Ordering::Relaxed),
            listing_failures: self.listing_failures.load(Ordering::Relaxed),
            links_discovered: self.links_discovered.load(Ordering::Relaxed),
            files_downloaded: self.files_downloaded.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Final statistics for one mirror run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Directories whose listing was requested
    pub directories_entered: u64,

    /// Directory listings that could not be fetched after all retries
    pub listing_failures: u64,

    /// In-scope links found across all listings
    pub links_discovered: u64,

    pub files_downloaded: u64,

    /// Files that were already present and non-empty
    pub files_skipped: u64,

    pub files_failed: u64,

    pub bytes_downloaded: u64,

    /// The run was interrupted before the frontier drained
    pub cancelled: bool,

    pub elapsed: Duration,
}

impl RunSummary {
    /// Returns true if any listing or file ended in a terminal failure
    pub fn has_failures(&self) -> bool {
        self.listing_failures > 0 || self.files_failed > 0
    }

    /// Returns true if the whole tree was mirrored without gaps
    pub fn is_complete(&self) -> bool {
        !self.has_failures() && !self.cancelled
    }
}

/// Logs the run summary, one line per figure
pub fn log_summary(summary: &RunSummary) {
    tracing::info!(
        "Directories entered: {} ({} listing failures)",
        summary.directories_entered,
        summary.listing_failures
    );
    tracing::info!("Links discovered: {}", summary.links_discovered);
    tracing::info!(
        "Files: {} downloaded, {} already present, {} failed",
        summary.files_downloaded,
        summary.files_skipped,
        summary.files_failed
    );

    let secs = summary.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        summary.bytes_downloaded as f64 / secs / 1024.0
    } else {
        0.0
    };
    tracing::info!(
        "Transferred {} bytes in {:.1?} ({:.1} KiB/s)",
        summary.bytes_downloaded,
        summary.elapsed,
        rate
    );

    if summary.cancelled {
        tracing::warn!("Run was cancelled; re-run to continue where it stopped");
    } else if summary.has_failures() {
        tracing::error!("Mirror finished with gaps; re-run to retry failed entries");
    }
}
