//! URL handling module for index-mirror
//!
//! This module provides root URL normalization, the scope check that keeps
//! the mirror inside its configured prefix, and the mapping from remote URLs
//! to local paths.

mod local_path;
mod scope;

pub use local_path::relative_local_path;
pub use scope::ScopeGuard;

use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes the configured root URL of the mirror
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an `http` or `https` scheme and a host
/// 3. Reject query strings and fragments (a root is a directory, not a view
///    of one)
/// 4. Append a trailing `/` to the path if it is missing
///
/// # Examples
///
/// ```
/// use index_mirror::url::normalize_root;
///
/// let root = normalize_root("https://www2.census.gov/geo/tiger/TIGER2024").unwrap();
/// assert_eq!(root.as_str(), "https://www2.census.gov/geo/tiger/TIGER2024/");
/// ```
pub fn normalize_root(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlError::Malformed(format!(
            "root URL must not carry a query or fragment: {}",
            url
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
