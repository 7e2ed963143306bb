//! State module for tracking mirror progress
//!
//! # Components
//!
//! - `VisitedSet`: the one piece of state shared by every traversal task
//! - `DownloadOutcome`: result of a single file download
//! - `RunStats` / `RunSummary`: counters gathered while the mirror runs

mod outcome;
mod stats;
mod visited;

// Re-export main types
pub use outcome::DownloadOutcome;
pub use stats::{log_summary, RunStats, RunSummary};
pub use visited::VisitedSet;
