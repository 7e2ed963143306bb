use crate::url::local_path::relative_local_path;
use crate::{UrlError, UrlResult};
use std::path::{Path, PathBuf};
use url::Url;

/// Keeps the mirror inside its configured root
///
/// A URL is in scope iff its serialized form starts with the serialized root
/// URL. This is an exact prefix match, not substring containment, so a link
/// such as `https://evil.example/?u=https://host/root/` never qualifies.
#[derive(Debug, Clone)]
pub struct ScopeGuard {
    root: Url,
}

impl ScopeGuard {
    /// Creates a guard for an already normalized root URL
    ///
    /// The root must end with `/`; see [`crate::url::normalize_root`].
    pub fn new(root: Url) -> Self {
        debug_assert!(root.path().ends_with('/'));
        Self { root }
    }

    /// The root URL of the mirror
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Returns true if `url` lies within the root prefix
    pub fn in_scope(&self, url: &Url) -> bool {
        url.as_str().starts_with(self.root.as_str())
    }

    /// Maps an in-scope URL onto a path under `destination`
    ///
    /// # Errors
    ///
    /// * `UrlError::OutOfScope` - the URL is not under the root
    /// * `UrlError::UnsafeSegment` - a decoded path segment would escape the
    ///   destination directory
    pub fn local_path(&self, destination: &Path, url: &Url) -> UrlResult<PathBuf> {
        if !self.in_scope(url) {
            return Err(UrlError::OutOfScope(url.to_string()));
        }
        let relative = relative_local_path(&self.root, url)?;
        Ok(destination.join(relative))
    }
}
