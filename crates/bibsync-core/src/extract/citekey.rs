//! Citation key resolution
//!
//! Precedence:
//! 1. the external key-manager store (item id → key), when readable
//! 2. the record's own `citationKey` field
//! 3. a `Citation Key: ...` line in the free-text `extra` field

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::{Connection, OpenFlags};

use super::rows::FieldMap;
use crate::error::ExtractError;

lazy_static! {
    // One "Citation Key: foo2020" line anywhere in the extra field
    static ref EXTRA_CITATION_KEY: Regex =
        Regex::new(r"(?mi)^\s*citation\s*key\s*:\s*(\S+)\s*$").unwrap();
}

/// Item id → citation key mapping from the key-manager store
#[derive(Debug, Clone, Default)]
pub struct KeyManager {
    keys: HashMap<i64, String>,
}

impl KeyManager {
    /// Load the mapping from a key-manager database.
    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::NotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let mut stmt = conn.prepare("SELECT itemID, citationKey FROM citationkey")?;
        let keys = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .filter_map(|row| match row {
                Ok((id, key)) if !key.trim().is_empty() => Some(Ok((id, key.trim().to_string()))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        tracing::debug!(keys = keys.len(), "loaded key manager {:?}", path);
        Ok(Self { keys })
    }

    /// Load the mapping, degrading to an empty one on any failure.
    ///
    /// The key manager is optional; failures are logged and resolution falls
    /// through to the in-record rules.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(manager) => manager,
            Err(e) => {
                tracing::warn!("key manager unavailable, using in-record keys: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_map(keys: HashMap<i64, String>) -> Self {
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolve an item's citation key following the precedence rules
    pub(crate) fn resolve(&self, item_id: i64, fields: &FieldMap) -> Option<String> {
        if let Some(key) = self.keys.get(&item_id) {
            return Some(key.clone());
        }

        if let Some(key) = fields
            .get("citationKey")
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
        {
            return Some(key.to_string());
        }

        fields.get("extra").and_then(|extra| citation_key_from_extra(extra))
    }
}

/// Extract a `Citation Key: ...` line from a free-text extra field
pub fn citation_key_from_extra(extra: &str) -> Option<String> {
    EXTRA_CITATION_KEY
        .captures(extra)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
