//! Versioned snapshot of the mirrored store

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Collection, Entry};

/// Current snapshot format version. Documents with another version are
/// treated as a cache miss.
pub const CACHE_VERSION: u32 = 1;

/// Entries, collections and the citation-key index, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// When this snapshot was last mutated
    pub last_modified_at: DateTime<Utc>,
    /// Source file mtime at the last sync
    pub source_modified_at: DateTime<Utc>,
    pub entries: Vec<Entry>,
    pub collections: BTreeMap<String, Collection>,
    /// Citation key → position in `entries`. Absent in legacy documents.
    #[serde(default)]
    pub identity_index: HashMap<String, usize>,
}

impl Snapshot {
    /// An empty snapshot synced at `source_modified_at`
    pub fn empty(source_modified_at: DateTime<Utc>) -> Self {
        Self {
            version: CACHE_VERSION,
            last_modified_at: Utc::now(),
            source_modified_at,
            entries: Vec::new(),
            collections: BTreeMap::new(),
            identity_index: HashMap::new(),
        }
    }

    /// Recompute the identity index from scratch.
    ///
    /// With duplicate keys the first position wins.
    pub fn rebuild_index(&mut self) {
        let mut index = HashMap::with_capacity(self.entries.len());
        for (position, entry) in self.entries.iter().enumerate() {
            index.entry(entry.citation_key.clone()).or_insert(position);
        }
        self.identity_index = index;
    }

    /// True when every entry is indexed at its own position
    pub fn index_is_consistent(&self) -> bool {
        self.identity_index.len() == self.entries.len()
            && self.entries.iter().enumerate().all(|(position, entry)| {
                self.identity_index.get(&entry.citation_key) == Some(&position)
            })
    }

    pub fn position(&self, citation_key: &str) -> Option<usize> {
        self.identity_index.get(citation_key).copied()
    }

    pub fn get(&self, citation_key: &str) -> Option<&Entry> {
        self.position(citation_key).and_then(|p| self.entries.get(p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace entries and collections wholesale
    pub(crate) fn replace_all(
        &mut self,
        entries: Vec<Entry>,
        collections: BTreeMap<String, Collection>,
    ) {
        self.entries = entries;
        self.collections = collections;
        self.rebuild_index();
    }

    /// Overwrite entries in place by citation key, append unknown ones.
    ///
    /// Entries absent from `entries` are left untouched; collections are
    /// replaced since they always arrive in full.
    pub(crate) fn upsert(&mut self, entries: Vec<Entry>, collections: BTreeMap<String, Collection>) {
        for entry in entries {
            match self.identity_index.get(&entry.citation_key).copied() {
                Some(position) => self.entries[position] = entry,
                None => {
                    self.identity_index
                        .insert(entry.citation_key.clone(), self.entries.len());
                    self.entries.push(entry);
                }
            }
        }
        self.collections = collections;
        self.rebuild_index();
    }
}
