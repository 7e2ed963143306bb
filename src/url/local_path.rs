use crate::{UrlError, UrlResult};
use std::path::PathBuf;
use url::Url;

/// Computes the path of `url` relative to `root` as a local relative path
///
/// Each remote path segment becomes one local path component after
/// percent-decoding. Query strings and fragments are ignored. Segments that
/// decode to `.` or `..`, or that contain a path separator or NUL byte, are
/// rejected so the result can never leave the destination directory.
///
/// `url` must start with `root`; callers check scope first.
pub fn relative_local_path(root: &Url, url: &Url) -> UrlResult<PathBuf> {
    let rest = url
        .as_str()
        .strip_prefix(root.as_str())
        .ok_or_else(|| UrlError::OutOfScope(url.to_string()))?;

    let rest = rest.split(['?', '#']).next().unwrap_or_default();

    let mut path = PathBuf::new();
    for segment in rest.split('/').filter(|s| !s.is_empty()) {
        let decoded = urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_string());

        if is_unsafe_segment(&decoded) {
            return Err(UrlError::UnsafeSegment {
                url: url.to_string(),
                segment: decoded,
            });
        }
        path.push(decoded);
    }

    Ok(path)
}

fn is_unsafe_segment(segment: &str) -> bool {
    segment == "." || segment == ".." || segment.contains(['/', '\\', '\0'])
}
