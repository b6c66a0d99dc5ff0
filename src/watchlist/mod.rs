//! Dynamic name/mutation watchlist
//!
//! Entries are keyed by `(term, mutation)` after trimming and lowercasing.
//! An empty mutation means "only animals without a mutation".


use crate::model::AnimalEntry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub term: String,
    pub mutation: String,
}

impl WatchEntry {
    /// Whether an animal matches this watch
    pub fn matches(&self, name: &str, mutation: &str) -> bool {
        normalize(name).contains(&self.term) && normalize(mutation) == self.mutation
    }
}

/// Trim and lowercase
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Process-lifetime watch set, insertion ordered
#[derive(Debug, Default)]
pub struct Watchlist {
    entries: RwLock<Vec<WatchEntry>>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a watch. Returns `None` for a blank term.
    pub fn add(&self, term: &str, mutation: Option<&str>) -> Option<WatchEntry> {
        let entry = WatchEntry {
            term: normalize(term),
            mutation: normalize(mutation.unwrap_or_default()),
        };
        if entry.term.is_empty() {
            return None;
        }

        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| **e == entry) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        Some(entry)
    }

    /// Bulk insert; blank terms are skipped
    pub fn add_many<'a, I>(&self, items: I) -> Vec<WatchEntry>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        items
            .into_iter()
            .filter_map(|(term, mutation)| self.add(term, mutation))
            .collect()
    }

    /// Returns true if the watch existed
    pub fn remove(&self, term: &str, mutation: Option<&str>) -> bool {
        let term = normalize(term);
        if term.is_empty() {
            return false;
        }
        let mutation = normalize(mutation.unwrap_or_default());

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| !(e.term == term && e.mutation == mutation));
        entries.len() != before
    }

    /// Bulk remove; returns how many watches were removed
    pub fn remove_many<'a, I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        items
            .into_iter()
            .filter(|(term, mutation)| self.remove(term, *mutation))
            .count()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn list(&self) -> Vec<WatchEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Entries matching at least one watch, each reported once, input order kept
    pub fn scan(&self, entries: &[AnimalEntry]) -> Vec<AnimalEntry> {
        let watches = self.entries.read();
        if watches.is_empty() {
            return Vec::new();
        }
        entries
            .iter()
            .filter(|entry| watches.iter().any(|w| w.matches(&entry.name, &entry.mutation)))
            .cloned()
            .collect()
    }
}
