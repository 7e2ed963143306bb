//! Work queue for the mirror
//!
//! Directory recursion is flattened into a frontier of tasks. Depth of the
//! remote tree becomes queue length rather than call-stack depth, and the
//! number of tasks running at once is capped so the remote server only ever
//! sees a fixed number of connections from us.

use crate::crawler::downloader::DownloadTask;
use std::collections::VecDeque;
use std::path::PathBuf;
use url::Url;

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlTask {
    /// List a directory and enqueue its entries
    Directory { url: Url, local_dir: PathBuf },

    /// Fetch a single file
    File(DownloadTask),
}

impl CrawlTask {
    pub fn url(&self) -> &Url {
        match self {
            Self::Directory { url, .. } => url,
            Self::File(task) => &task.url,
        }
    }
}

/// Scheduler manages the frontier queue and the in-flight limit
///
/// Tasks are handed out first-in first-out. Siblings carry no ordering
/// guarantee once they run concurrently.
#[derive(Debug)]
pub struct Scheduler {
    /// Tasks waiting to run
    frontier: VecDeque<CrawlTask>,

    /// Maximum number of tasks running at once
    max_in_flight: usize,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `max_in_flight` - Concurrency cap; values below 1 are treated as 1
    /// * `initial_frontier` - Tasks to start from
    pub fn new(max_in_flight: usize, initial_frontier: Vec<CrawlTask>) -> Self {
        Self {
            frontier: VecDeque::from(initial_frontier),
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Returns the next task if one is waiting and there is room to run it
    ///
    /// # Arguments
    ///
    /// * `in_flight` - Number of tasks currently running
    pub fn next_task(&mut self, in_flight: usize) -> Option<CrawlTask> {
        if in_flight >= self.max_in_flight {
            return None;
        }
        self.frontier.pop_front()
    }

    /// Adds several tasks, preserving their order
    pub fn extend_frontier(&mut self, tasks: impl IntoIterator<Item = CrawlTask>) {
        self.frontier.extend(tasks);
    }

    /// Drops every waiting task, returning how many were discarded
    pub fn clear_frontier(&mut self) -> usize {
        let dropped = self.frontier.len();
        self.frontier.clear();
        dropped
    }

    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}
