//! Append-only store of the trees produced by a scan, grouped by file.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::model::Node;

#[derive(Debug, Default)]
pub struct Inventory {
    entries: Mutex<BTreeMap<String, Vec<Node>>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, Vec<Node>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, file_path: impl Into<String>, nodes: Vec<Node>) {
        if nodes.is_empty() {
            return;
        }
        self.entries()
            .entry(file_path.into())
            .or_default()
            .extend(nodes);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<Node>> {
        self.entries().clone()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.entries())
    }

    /// Number of root nodes across all files.
    pub fn len(&self) -> usize {
        self.entries().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn file_count(&self) -> usize {
        self.entries().len()
    }
}
