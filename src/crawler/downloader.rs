//! File downloader
//!
//! Streams one remote file to one local path. A file that already exists
//! with a non-zero size is never fetched again, which is what makes repeated
//! runs cheap. To keep that check honest, bytes are streamed into a
//! `<name>.part` sibling and only renamed onto the final path once the whole
//! body has been written.
//!
//! There is no deadline on a whole transfer. The idle timeout bounds the wait
//! for response headers and for every body chunk instead, so a slow but steady
//! stream always completes while a stalled one is retried.

use crate::crawler::retry::RetryPolicy;
use crate::state::DownloadOutcome;
use crate::MirrorError;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::{Client, Response, StatusCode};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Suffix of the temporary file a download is streamed into
pub const PART_SUFFIX: &str = ".part";

/// A remote file and where it goes locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: Url,
    pub path: PathBuf,
}

/// Downloads files with retry, resume-by-skip and progress reporting
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    retry: RetryPolicy,
    idle_timeout: Duration,
    progress: MultiProgress,
}

impl Downloader {
    /// Creates a downloader
    ///
    /// `idle_timeout` is the longest the downloader waits for headers or for
    /// the next chunk of a body. When `show_progress` is false no progress
    /// bars are drawn.
    pub fn new(
        client: Client,
        retry: RetryPolicy,
        idle_timeout: Duration,
        show_progress: bool,
    ) -> Self {
        let progress = if show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        Self {
            client,
            retry,
            idle_timeout,
            progress,
        }
    }

    /// Downloads `task.url` to `task.path`
    ///
    /// # Returns
    ///
    /// * `DownloadOutcome::Skipped` - A non-empty file is already there; no
    ///   request was made
    /// * `DownloadOutcome::Done` - The file was written in full
    /// * `DownloadOutcome::Failed` - Retries were exhausted, the destination
    ///   could not be written, or the run was cancelled
    pub async fn download(&self, task: &DownloadTask, cancel: &CancellationToken) -> DownloadOutcome {
        if is_present(&task.path).await {
            tracing::info!(
                "File already exists and is non-empty: {}",
                task.path.display()
            );
            return DownloadOutcome::Skipped;
        }

        let result = self
            .retry
            .run("Downloading", task.url.as_str(), cancel, |_| self.attempt(task))
            .await;

        match result {
            Ok(bytes) => {
                tracing::info!("Downloaded: {} ({} bytes)", task.path.display(), bytes);
                DownloadOutcome::Done { bytes }
            }
            Err(e) => {
                tracing::error!("Skipping {}: {}", task.url, e);
                DownloadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// One GET, streamed to disk
    async fn attempt(&self, task: &DownloadTask) -> Result<u64, MirrorError> {
        let request = self.client.get(task.url.clone()).send();
        let response = tokio::time::timeout(self.idle_timeout, request)
            .await
            .map_err(|_| MirrorError::Timeout {
                url: task.url.to_string(),
            })?
            .map_err(|e| MirrorError::from_request(task.url.as_str(), e))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::error!(
                "Failed to download {}, status code {}",
                task.url,
                status.as_u16()
            );
            return Err(MirrorError::HttpStatus {
                url: task.url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = task.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MirrorError::io(parent, e))?;
        }

        let part = part_path(&task.path);
        match self.write_body(response, task, &part).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&part).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            "Could not remove partial file {}: {}",
                            part.display(),
                            remove_err
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Streams the response into `part`, then renames it onto the final path
    async fn write_body(
        &self,
        response: Response,
        task: &DownloadTask,
        part: &Path,
    ) -> Result<u64, MirrorError> {
        let pb = self.progress_bar(response.content_length(), &task.path);
        let result = stream_to_file(response, task, part, self.idle_timeout, &pb).await;
        pb.finish_and_clear();

        let written = result?;
        tokio::fs::rename(part, &task.path)
            .await
            .map_err(|e| MirrorError::io(&task.path, e))?;

        Ok(written)
    }

    fn progress_bar(&self, total: Option<u64>, path: &Path) -> ProgressBar {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let pb = match total {
            Some(len) => {
                let style = ProgressStyle::with_template(
                    "{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
                ProgressBar::new(len).with_style(style)
            }
            None => {
                let style = ProgressStyle::with_template("{spinner} {msg} {bytes} ({bytes_per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                ProgressBar::new_spinner().with_style(style)
            }
        };

        self.progress.add(pb.with_message(name))
    }
}

async fn stream_to_file(
    response: Response,
    task: &DownloadTask,
    part: &Path,
    idle_timeout: Duration,
    pb: &ProgressBar,
) -> Result<u64, MirrorError> {
    let mut file = tokio::fs::File::create(part)
        .await
        .map_err(|e| MirrorError::io(part, e))?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    loop {
        let item = match tokio::time::timeout(idle_timeout, stream.next()).await {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(_) => {
                return Err(MirrorError::Timeout {
                    url: task.url.to_string(),
                })
            }
        };

        let chunk = item.map_err(|e| MirrorError::Stream {
            url: task.url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| MirrorError::io(part, e))?;

        written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await.map_err(|e| MirrorError::io(part, e))?;
    file.sync_all().await.map_err(|e| MirrorError::io(part, e))?;
    Ok(written)
}

/// Returns true if `path` is a regular file with at least one byte
pub async fn is_present(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Temporary path a download of `path` is streamed into
pub fn part_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(PART_SUFFIX);
    path.with_file_name(name)
}
