//! Per-session memoization of resolved trees.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::graph::DependencyNode;

/// Resolved trees keyed by root package name.
///
/// The key is the name alone: a second request for the same name with a
/// different version range is served the tree already stored. Writes are
/// last-write-wins. A cache is never emptied in place; callers drop it and
/// build a new one, so a late writer holding the old `Arc` cannot repopulate
/// the replacement.
#[derive(Debug, Default)]
pub struct TreeCache {
    entries: Mutex<HashMap<String, Arc<DependencyNode>>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<DependencyNode>>> {
        // Entries are plain values, so a poisoned lock still holds usable data.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, name: &str) -> Option<Arc<DependencyNode>> {
        self.entries().get(name).cloned()
    }

    pub fn insert(&self, name: impl Into<String>, tree: Arc<DependencyNode>) {
        self.entries().insert(name.into(), tree);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Cached package names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries().keys().cloned().collect();
        names.sort();
        names
    }
}
