use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for index-mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// What to mirror and where to put it
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Root of the remote directory listing; nothing outside this prefix is
    /// ever fetched
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Local directory that mirrors the root URL
    pub destination: PathBuf,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of listing fetches and downloads in flight at once
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    /// Request timeout (seconds)
    ///
    /// Bounds a whole listing-page request. For file downloads it bounds the
    /// wait for response headers and for each body chunk, so a large file
    /// that keeps streaming is never cut off.
    #[serde(rename = "request-timeout", default = "default_timeout")]
    pub request_timeout: u64,

    /// TCP connect timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_timeout")]
    pub connect_timeout: u64,

    /// Draw per-file progress bars
    #[serde(rename = "show-progress", default = "default_true")]
    pub show_progress: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            request_timeout: default_timeout(),
            connect_timeout: default_timeout(),
            show_progress: true,
        }
    }
}

/// How long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles after each failed attempt, capped at `max-backoff`
    Exponential,
}

/// Retry behavior shared by listing fetches and file downloads
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_backoff")]
    pub backoff: u64,

    #[serde(default = "default_strategy")]
    pub strategy: BackoffStrategy,

    /// Upper bound for exponential delays (milliseconds)
    #[serde(rename = "max-backoff", default = "default_max_backoff")]
    pub max_backoff: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
            strategy: default_strategy(),
            max_backoff: default_max_backoff(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email", default)]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// `Name/Version`, followed by `(+ContactURL; ContactEmail)` when any
    /// contact information is configured.
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = [
            self.contact_url.as_ref().map(|u| format!("+{}", u)),
            self.contact_email.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

fn default_max_concurrent() -> u32 {
    4
}

fn default_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> u64 {
    5000
}

fn default_strategy() -> BackoffStrategy {
    BackoffStrategy::Fixed
}

fn default_max_backoff() -> u64 {
    60_000
}

fn default_crawler_name() -> String {
    "index-mirror".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
