//! Collection representation for grouping entries

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Upper bound on parent-chain traversal. Source parent pointers are not
/// cycle-checked, so ascent stops here even if no cycle is detected.
pub const MAX_COLLECTION_DEPTH: usize = 64;

/// A collection (folder) in the reference store
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collection {
    pub key: String,
    pub name: String,
    pub parent_key: Option<String>,
    pub member_item_ids: BTreeSet<i64>,
}

impl Collection {
    /// Create a new root collection
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            parent_key: None,
            member_item_ids: BTreeSet::new(),
        }
    }

    /// Place this collection under a parent
    pub fn with_parent(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_key.is_none()
    }

    pub fn contains(&self, item_id: i64) -> bool {
        self.member_item_ids.contains(&item_id)
    }
}

/// Names from the root down to `key` ("Work", "Project A", "Drafts").
///
/// Returns an empty path for unknown keys. A parent link that points to a
/// missing collection ends the chain; a cycle or a chain deeper than
/// [`MAX_COLLECTION_DEPTH`] is cut at the first repeated key.
pub fn collection_path(key: &str, collections: &BTreeMap<String, Collection>) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut current = collections.get(key);

    while let Some(collection) = current {
        if !seen.insert(collection.key.as_str()) || names.len() >= MAX_COLLECTION_DEPTH {
            break;
        }
        names.push(collection.name.clone());
        current = collection
            .parent_key
            .as_deref()
            .and_then(|parent| collections.get(parent));
    }

    names.reverse();
    names
}

/// Keys of every collection the item belongs to, in key order
pub fn collections_for_item(item_id: i64, collections: &BTreeMap<String, Collection>) -> Vec<String> {
    collections
        .values()
        .filter(|c| c.contains(item_id))
        .map(|c| c.key.clone())
        .collect()
}
