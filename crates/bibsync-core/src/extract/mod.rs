//! Source extraction
//!
//! Reads the reference store (a Zotero-layout SQLite database) and
//! normalizes its records into [`Entry`] and [`Collection`] values.
//!
//! - Attachments, notes and annotations never become entries; their content
//!   and timestamps are folded into their parent entry.
//! - Items in the trash are skipped.
//! - Records whose citation key cannot be resolved are dropped silently.

mod citekey;
mod normalize;
mod rows;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags};

use crate::domain::{Collection, Entry};
use crate::error::ExtractError;

pub use citekey::{citation_key_from_extra, KeyManager};
pub use rows::SOURCE_TIME_FORMAT;

/// Item ids per `IN (...)` list, keeping statements under SQLite's length limit
const ID_BATCH: usize = 10_000;

/// Handle on the external reference store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStore {
    /// Path to the reference database
    pub database: PathBuf,
    /// Optional citation-key manager database (item id → citation key)
    pub key_manager: Option<PathBuf>,
}

impl SourceStore {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            key_manager: None,
        }
    }

    pub fn with_key_manager(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_manager = Some(path.into());
        self
    }

    /// Current modification time of the source database file
    pub fn modified_at(&self) -> Result<DateTime<Utc>, ExtractError> {
        let metadata = std::fs::metadata(&self.database).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::NotFound(self.database.clone())
            } else {
                ExtractError::Read(e.to_string())
            }
        })?;
        let modified = metadata
            .modified()
            .map_err(|e| ExtractError::Read(e.to_string()))?;
        Ok(DateTime::<Utc>::from(modified))
    }
}

/// Result of a full extraction
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub entries: Vec<Entry>,
    pub collections: BTreeMap<String, Collection>,
}

/// Result of an incremental extraction that found changes
#[derive(Debug, Clone, Default)]
pub struct IncrementalExtraction {
    pub entries: Vec<Entry>,
    pub changed_keys: Vec<String>,
    pub collections: BTreeMap<String, Collection>,
}

/// Read every entry and collection from the source.
pub fn extract_full(source: &SourceStore) -> Result<Extraction, ExtractError> {
    let conn = open_source(&source.database)?;
    let keys = KeyManager::load_or_empty(source.key_manager.as_deref());

    let collections = rows::load_collections(&conn)?;
    let entries = read_entries(&conn, None, &keys, &collections)?;

    tracing::info!(
        entries = entries.len(),
        collections = collections.len(),
        "full extraction from {:?}",
        source.database
    );

    Ok(Extraction {
        entries,
        collections,
    })
}

/// Read only entries created or modified strictly after `since`.
///
/// An entry also counts as changed when one of its attachments, notes or
/// annotations changed after `since`. Returns `None` when nothing changed.
/// Collections are always returned in full.
pub fn extract_incremental(
    source: &SourceStore,
    since: DateTime<Utc>,
) -> Result<Option<IncrementalExtraction>, ExtractError> {
    let conn = open_source(&source.database)?;
    let keys = KeyManager::load_or_empty(source.key_manager.as_deref());

    let collections = rows::load_collections(&conn)?;
    let entries = read_entries(&conn, Some(since), &keys, &collections)?;

    if entries.is_empty() {
        tracing::debug!("no changes in {:?} since {}", source.database, since);
        return Ok(None);
    }

    tracing::info!(
        changed = entries.len(),
        "incremental extraction from {:?} since {}",
        source.database,
        since
    );

    let changed_keys = entries.iter().map(|e| e.citation_key.clone()).collect();
    Ok(Some(IncrementalExtraction {
        entries,
        changed_keys,
        collections,
    }))
}

/// Open the source read-only without taking locks.
///
/// `immutable=1` lets extraction run while the reference manager holds the
/// database open for writing.
pub(crate) fn open_source(path: &Path) -> Result<Connection, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }

    let uri = format!("file:{}?immutable=1", escape_uri_path(path));
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(uri, flags)?;

    // SQLite defers header validation until the first statement
    conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get::<_, i64>(0))?;
    Ok(conn)
}

fn escape_uri_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('%', "%25")
        .replace('?', "%3f")
        .replace('#', "%23")
}

fn read_entries(
    conn: &Connection,
    since: Option<DateTime<Utc>>,
    keys: &KeyManager,
    collections: &BTreeMap<String, Collection>,
) -> Result<Vec<Entry>, ExtractError> {
    let items = rows::load_items(conn, since)?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = items.iter().map(|i| i.item_id).collect();
    let mut fields = HashMap::new();
    let mut creators = HashMap::new();
    let mut tags = HashMap::new();
    let mut children = HashMap::new();
    for batch in ids.chunks(ID_BATCH) {
        fields.extend(rows::load_fields(conn, batch)?);
        creators.extend(rows::load_creators(conn, batch)?);
        tags.extend(rows::load_tags(conn, batch)?);
        children.extend(rows::load_children(conn, batch)?);
    }

    let mut seen_keys = HashSet::new();
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        let item_id = item.item_id;
        let item_fields = fields.remove(&item_id).unwrap_or_default();
        let Some(citation_key) = keys.resolve(item_id, &item_fields) else {
            tracing::debug!(item_id, "no citation key, skipping");
            continue;
        };
        if !seen_keys.insert(citation_key.clone()) {
            tracing::warn!(
                item_id,
                "duplicate citation key {:?}, keeping the first item",
                citation_key
            );
            continue;
        }

        entries.push(normalize::build_entry(normalize::EntryParts {
            citation_key,
            item,
            fields: item_fields,
            creators: creators.remove(&item_id).unwrap_or_default(),
            tags: tags.remove(&item_id).unwrap_or_default(),
            children: children.remove(&item_id).unwrap_or_default(),
            collections,
        }));
    }

    Ok(entries)
}
