//! HTML parser for directory-listing pages
//!
//! This module turns the markup of an index page (Apache `mod_autoindex`,
//! nginx `autoindex` and similar) into the entries it lists.

use crate::url::ScopeGuard;
use scraper::{Html, Selector};
use url::Url;

/// Column-sort links emitted by Apache directory indexes
pub const SORT_CONTROL_LINKS: &[&str] = &["?C=N;O=D", "?C=M;O=A", "?C=S;O=A", "?C=D;O=A"];

/// Relative navigation links that point back up or at the page itself
const NAVIGATION_LINKS: &[&str] = &["../", "./"];

/// Whether a listing entry is a subdirectory or a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

/// A single entry found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLink {
    /// The href as written on the page, percent-decoded
    pub name: String,

    /// The href resolved against the listing page URL, still percent-encoded
    pub url: Url,

    /// Directory iff `name` ends with `/`
    pub kind: EntryKind,
}

impl EntryLink {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Extracts the entries of a directory-listing page
///
/// # Filtering Rules
///
/// Applied in order to every `<a href="...">`:
///
/// 1. Drop `../`, `./`, empty and fragment-only hrefs, and `mailto:`,
///    `javascript:`, `tel:` and `data:` links
/// 2. Percent-decode the href into the entry name
/// 3. Drop the column-sort links (`?C=N;O=D` and friends) and any other
///    query-only href, since those only re-render the current page
/// 4. Resolve the raw href against `page_url`; drop non-HTTP(S) results and
///    anything the scope guard rejects
///
/// Resolution uses the href as written, so an encoded `%23` or `%3F` in a file
/// name stays part of the path instead of starting a fragment or query.
///
/// Entries are returned in page order.
///
/// # Example
///
/// ```
/// use index_mirror::crawler::{extract_entries, EntryKind};
/// use index_mirror::url::ScopeGuard;
/// use url::Url;
///
/// let page = Url::parse("http://x/A/").unwrap();
/// let scope = ScopeGuard::new(page.clone());
/// let html = r#"<a href="?C=N;O=D">Name</a><a href="sub/">sub/</a><a href="a.txt">a.txt</a>"#;
///
/// let entries = extract_entries(html, &page, &scope);
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].kind, EntryKind::Directory);
/// assert_eq!(entries[1].url.as_str(), "http://x/A/a.txt");
/// ```
pub fn extract_entries(html: &str, page_url: &Url, scope: &ScopeGuard) -> Vec<EntryLink> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return entries;
    };

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(entry) = resolve_entry(href, page_url) else {
            continue;
        };

        if !scope.in_scope(&entry.url) {
            tracing::debug!("Ignoring out-of-scope link {} on {}", entry.url, page_url);
            continue;
        }

        entries.push(entry);
    }

    entries
}

/// Turns one raw href into an entry, or None if it should be skipped
fn resolve_entry(href: &str, page_url: &Url) -> Option<EntryLink> {
    let href = href.trim();
    if is_navigation_link(href) {
        return None;
    }

    let name = urlencoding::decode(href)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string());

    if is_sort_control(&name) {
        return None;
    }

    let url = page_url.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let kind = if name.ends_with('/') {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    Some(EntryLink { name, url, kind })
}

fn is_navigation_link(href: &str) -> bool {
    let href = href.trim();

    href.is_empty()
        || NAVIGATION_LINKS.contains(&href)
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
}

fn is_sort_control(name: &str) -> bool {
    SORT_CONTROL_LINKS.contains(&name) || name.starts_with('?')
}
