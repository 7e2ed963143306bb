use std::collections::HashSet;
use std::sync::Mutex;
use url::Url;

/// Set of URLs already claimed by a traversal task
///
/// Membership check and insertion happen under one lock, so two tasks racing
/// on the same URL can never both win.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url`, returning true if it was not seen before
    ///
    /// Fragments are ignored when comparing URLs.
    pub fn insert(&self, url: &Url) -> bool {
        let key = visit_key(url);
        let mut urls = self.urls.lock().unwrap_or_else(|e| e.into_inner());
        urls.insert(key)
    }

    pub fn len(&self) -> usize {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn visit_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}
