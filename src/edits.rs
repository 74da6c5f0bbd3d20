//! Paths whose contents changed on disk while the browser was open.
//!
//! Fed from line-count recounts: a file whose size or mtime moved since its
//! last count was rewritten by something outside the browser. Markers stay
//! until cleared.

use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct EditTracker {
    paths: HashSet<PathBuf>,
}

impl EditTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record changed paths. Returns true if any of them was new.
    pub fn record(&mut self, paths: impl IntoIterator<Item = PathBuf>) -> bool {
        let mut grew = false;
        for path in paths {
            grew |= self.paths.insert(path);
        }
        if grew {
            tracing::debug!(tracked = self.paths.len(), "external edits recorded");
        }
        grew
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn paths(&self) -> &HashSet<PathBuf> {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
