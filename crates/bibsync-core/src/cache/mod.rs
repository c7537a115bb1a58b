//! Local snapshot cache
//!
//! One JSON document per source store, holding the normalized entries, the
//! collections and a citation-key index. The cache is a best-effort
//! accelerator: read and write failures are logged and reported as a miss,
//! never surfaced to the caller.

mod snapshot;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::{Collection, Entry};
use crate::error::CacheError;
use crate::extract::SourceStore;

pub use snapshot::{Snapshot, CACHE_VERSION};

/// Persisted mirror of one source store
#[derive(Debug)]
pub struct CacheStore {
    source_path: PathBuf,
    cache_path: PathBuf,
    snapshot: Option<Snapshot>,
}

impl CacheStore {
    /// Cache for `source`, stored under `cache_dir`
    pub fn new(source: &SourceStore, cache_dir: impl AsRef<Path>) -> Self {
        let cache_path = cache_dir
            .as_ref()
            .join(format!("{}.json", cache_file_stem(&source.database)));
        Self {
            source_path: source.database.clone(),
            cache_path,
            snapshot: None,
        }
    }

    /// Location of the snapshot document
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// The in-memory snapshot, if loaded or built this session
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Read the persisted snapshot.
    ///
    /// Returns `None` when the document is missing, unreadable, or written
    /// by another format version; the in-memory snapshot is left untouched
    /// in that case. A missing or stale identity index is rebuilt.
    pub async fn load(&mut self) -> Option<&Snapshot> {
        match self.read_snapshot().await {
            Ok(Some(snapshot)) => {
                tracing::debug!(
                    entries = snapshot.len(),
                    "loaded cache {:?}",
                    self.cache_path
                );
                self.snapshot = Some(snapshot);
                self.snapshot.as_ref()
            }
            Ok(None) => {
                tracing::debug!("no cache at {:?}", self.cache_path);
                None
            }
            Err(e) => {
                tracing::warn!("ignoring cache {:?}: {}", self.cache_path, e);
                None
            }
        }
    }

    async fn read_snapshot(&self) -> Result<Option<Snapshot>, CacheError> {
        let bytes = match tokio::fs::read(&self.cache_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != CACHE_VERSION {
            return Err(CacheError::VersionMismatch {
                expected: CACHE_VERSION,
                actual: snapshot.version,
            });
        }
        if !snapshot.index_is_consistent() {
            tracing::debug!("rebuilding identity index for {:?}", self.cache_path);
            snapshot.rebuild_index();
        }
        Ok(Some(snapshot))
    }

    /// True when the source was modified after the last sync, or when there
    /// is nothing to compare against.
    pub async fn has_source_changed(&self, source: &SourceStore) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return true;
        };
        match source_mtime(&source.database).await {
            Some(modified) => modified > snapshot.source_modified_at,
            None => {
                tracing::debug!("cannot stat {:?}, assuming changed", source.database);
                true
            }
        }
    }

    /// Merge extracted data into the snapshot.
    ///
    /// With `changed_keys` present, only those entries are upserted by
    /// citation key; otherwise entries and collections are replaced
    /// wholesale. The source timestamp is read from the source file now.
    pub async fn update(
        &mut self,
        entries: Vec<Entry>,
        collections: BTreeMap<String, Collection>,
        changed_keys: Option<&[String]>,
    ) {
        let source_modified_at = source_mtime(&self.source_path)
            .await
            .unwrap_or_else(Utc::now);
        self.update_at(entries, collections, changed_keys, source_modified_at);
    }

    /// Like [`update`](Self::update), with a source timestamp captured by
    /// the caller before extraction started.
    pub fn update_at(
        &mut self,
        entries: Vec<Entry>,
        collections: BTreeMap<String, Collection>,
        changed_keys: Option<&[String]>,
        source_modified_at: DateTime<Utc>,
    ) {
        let snapshot = self
            .snapshot
            .get_or_insert_with(|| Snapshot::empty(source_modified_at));

        match changed_keys {
            Some(keys) => {
                let keys: HashSet<&str> = keys.iter().map(String::as_str).collect();
                let entries: Vec<Entry> = entries
                    .into_iter()
                    .filter(|e| keys.contains(e.citation_key.as_str()))
                    .collect();
                tracing::debug!(upserted = entries.len(), "incremental cache update");
                snapshot.upsert(entries, collections);
            }
            None => {
                tracing::debug!(entries = entries.len(), "full cache update");
                snapshot.replace_all(entries, collections);
            }
        }

        snapshot.version = CACHE_VERSION;
        snapshot.source_modified_at = source_modified_at;
        snapshot.last_modified_at = Utc::now();
    }

    /// Record a sync that found nothing to change
    pub fn mark_synced(&mut self, source_modified_at: DateTime<Utc>) {
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.source_modified_at = source_modified_at;
            snapshot.last_modified_at = Utc::now();
        }
    }

    /// Persist the snapshot. Failures are logged, never returned.
    pub async fn save(&self) {
        if let Err(e) = self.write_snapshot().await {
            tracing::warn!("failed to save cache {:?}: {}", self.cache_path, e);
        }
    }

    async fn write_snapshot(&self) -> Result<(), CacheError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        if let Some(parent) = self.cache_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(snapshot)?;

        // Readers never observe a half-written document
        let tmp = self.cache_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.cache_path).await?;

        tracing::debug!(
            entries = snapshot.len(),
            bytes = bytes.len(),
            "saved cache {:?}",
            self.cache_path
        );
        Ok(())
    }

    /// Delete the persisted document and drop the in-memory snapshot
    pub async fn clear(&mut self) {
        self.snapshot = None;
        match tokio::fs::remove_file(&self.cache_path).await {
            Ok(()) => tracing::info!("cleared cache {:?}", self.cache_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to clear cache {:?}: {}", self.cache_path, e),
        }
    }
}

async fn source_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// File-name-safe rendering of the source path
fn cache_file_stem(source: &Path) -> String {
    let stem: String = source
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches(|c| c == '_' || c == '.');
    if stem.is_empty() {
        "source".to_string()
    } else {
        stem.to_string()
    }
}
