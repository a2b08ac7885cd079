use std::collections::HashSet;

/// Record of every URL that has been scheduled for fetching
///
/// URLs are compared as exact strings; no normalization happens here. A mark
/// is never removed for the lifetime of the set.
#[derive(Debug, Default)]
pub struct SeenSet {
    urls: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as seen; returns `true` if it was not seen before
    pub fn mark(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
