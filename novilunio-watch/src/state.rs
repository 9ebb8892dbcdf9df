//! Seen-sets of the watcher (`watch_state.json`).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use novilunio_core::StoreError;
use novilunio_core::store;
use serde::{Deserialize, Serialize};

/// Article links already observed, per watched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchState {
    pages: BTreeMap<String, BTreeSet<String>>,
}

impl WatchState {
    /// Missing or corrupt files give an empty state.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        store::load_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        store::write_json_atomic(path, self)
    }

    /// Whether `page` has a non-empty seen-set.
    pub fn is_seeded(&self, page: &str) -> bool {
        self.pages.get(page).is_some_and(|seen| !seen.is_empty())
    }

    pub fn seen(&self, page: &str) -> Option<&BTreeSet<String>> {
        self.pages.get(page)
    }

    /// Replace the seen-set of `page` with `links`.
    pub fn seed(&mut self, page: &str, links: BTreeSet<String>) {
        self.pages.insert(page.to_string(), links);
    }

    /// Links of `current` not seen yet on `page`, sorted.
    pub fn unseen<'a>(&'a self, page: &str, current: &'a BTreeSet<String>) -> Vec<&'a String> {
        match self.pages.get(page) {
            Some(seen) => current.difference(seen).collect(),
            None => current.iter().collect(),
        }
    }

    pub fn mark_seen(&mut self, page: &str, link: &str) {
        self.pages
            .entry(page.to_string())
            .or_default()
            .insert(link.to_string());
    }

    /// Drop pages that are no longer watched. Returns how many were dropped.
    pub fn retain_pages(&mut self, watched: &[String]) -> usize {
        let before = self.pages.len();
        self.pages.retain(|page, _| watched.iter().any(|w| w == page));
        before - self.pages.len()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}
