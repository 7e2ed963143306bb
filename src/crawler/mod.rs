//! Crawler module for directory-listing traversal and file download
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching of listing pages with retry logic
//! - HTML parsing and entry extraction
//! - Streaming, resumable file downloads
//! - The bounded work queue and overall coordination

mod coordinator;
mod downloader;
mod fetcher;
mod parser;
mod retry;
mod scheduler;

pub use coordinator::{run_mirror, Mirror};
pub use downloader::{is_present, part_path, DownloadTask, Downloader, PART_SUFFIX};
pub use fetcher::{build_http_client, fetch_page, PageFetcher};
pub use parser::{extract_entries, EntryKind, EntryLink, SORT_CONTROL_LINKS};
pub use retry::RetryPolicy;
pub use scheduler::{CrawlTask, Scheduler};
