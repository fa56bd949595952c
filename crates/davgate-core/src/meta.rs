//! The in-process user-metadata overlay.
//!
//! WebDAV has no native place for S3 user metadata, so the gateway keeps a
//! process-local map from full path (`bucket/key`) to the metadata headers
//! of the last put/touch/copy. Lost on restart, not shared across
//! instances; a documented limitation.

use std::collections::HashMap;

use dashmap::DashMap;

/// Path → user-metadata map.
#[derive(Debug, Default)]
pub struct MetaStore {
    entries: DashMap<String, HashMap<String, String>>,
}

impl MetaStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the metadata for `path`.
    pub fn store(&self, path: &str, meta: HashMap<String, String>) {
        self.entries.insert(path.to_owned(), meta);
    }

    /// Fetch a copy of the metadata for `path`.
    #[must_use]
    pub fn load(&self, path: &str) -> Option<HashMap<String, String>> {
        self.entries.get(path).map(|entry| entry.clone())
    }

    /// Drop the metadata for `path`.
    pub fn remove(&self, path: &str) {
        self.entries.remove(path);
    }
}
