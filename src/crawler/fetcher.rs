//! HTTP fetcher implementation
//!
//! This module handles the HTTP side of the mirror:
//! - Building the shared HTTP client with a proper user agent string
//!
//! The client itself carries no total timeout, since file downloads may take
//! far longer than any sensible request deadline. Listing requests set their
//! own deadline.
//! - GET requests for directory-listing pages, with retry
//! - Classifying responses into success or transient failure

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::retry::RetryPolicy;
use crate::MirrorError;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Connect timeout for every connection the client opens
///
/// # Example
///
/// ```no_run
/// use index_mirror::config::{CrawlerConfig, UserAgentConfig};
/// use index_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .connect_timeout(Duration::from_secs(crawler.connect_timeout))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches directory-listing pages
///
/// Every non-200 response, timeout or transport error is retried according
/// to the retry policy. Once retries are exhausted the error is returned to
/// the caller, which treats the directory as empty.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    retry: RetryPolicy,
    timeout: Duration,
}

impl PageFetcher {
    /// Creates a fetcher whose requests each finish within `timeout`
    pub fn new(client: Client, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            retry,
            timeout,
        }
    }

    /// Fetches the listing page at `url` and returns its body as text
    pub async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<String, MirrorError> {
        self.retry
            .run("Fetching links from", url.as_str(), cancel, |_| {
                fetch_page(&self.client, url, self.timeout)
            })
            .await
    }
}

/// Performs a single GET for a listing page
///
/// `timeout` covers the whole request, body included.
///
/// # Returns
///
/// * `Ok(String)` - Body of a 200 response
/// * `Err(MirrorError::HttpStatus)` - Any other status
/// * `Err(MirrorError::Timeout)` / `Err(MirrorError::Http)` - Transport failure
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<String, MirrorError> {
    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| MirrorError::from_request(url.as_str(), e))?;

    let status = response.status();
    if status != StatusCode::OK {
        tracing::error!("Failed to access {}, status code {}", url, status.as_u16());
        return Err(MirrorError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| MirrorError::from_request(url.as_str(), e))
}
