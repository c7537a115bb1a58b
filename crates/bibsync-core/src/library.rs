//! Library: source, cache and search index for one reference store

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};

use crate::cache::CacheStore;
use crate::config::BibsyncConfig;
use crate::domain::{collection_path, Collection, Entry};
use crate::error::Result;
use crate::extract::{extract_full, extract_incremental, SourceStore};
use crate::search::{DebouncedSearch, SearchEngine, SearchHit, DEFAULT_DEBOUNCE};

/// Re-read window before the last sync.
///
/// Source timestamps have whole-second resolution while file mtimes do not,
/// so an edit in the same second as the last sync must still be picked up.
const SYNC_OVERLAP_SECS: i64 = 1;

/// What a refresh did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Source untouched since the last sync
    UpToDate,
    /// Source file changed but no entry did
    Unchanged,
    /// Changed entries were upserted
    Incremental { changed: usize },
    /// The whole snapshot was rebuilt
    Full { entries: usize },
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::UpToDate => write!(f, "up to date"),
            SyncOutcome::Unchanged => write!(f, "no entries changed"),
            SyncOutcome::Incremental { changed } => write!(f, "{} entries updated", changed),
            SyncOutcome::Full { entries } => write!(f, "{} entries loaded", entries),
        }
    }
}

/// A mirrored reference store
pub struct Library {
    source: SourceStore,
    cache: CacheStore,
    engine: Arc<Mutex<SearchEngine>>,
    debounce: Duration,
}

impl Library {
    /// Library for the configured source and cache directory
    pub fn open(config: &BibsyncConfig) -> Self {
        let mut library = Self::new(config.source_store(), config.cache_dir());
        library.debounce = config.debounce();
        library
    }

    pub fn new(source: SourceStore, cache_dir: impl AsRef<Path>) -> Self {
        let cache = CacheStore::new(&source, cache_dir);
        Self {
            source,
            cache,
            engine: Arc::new(Mutex::new(SearchEngine::default())),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn source(&self) -> &SourceStore {
        &self.source
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Bring the snapshot up to date with the source.
    ///
    /// Loads the persisted snapshot on first use, then extracts only what
    /// changed since the last sync, or everything when there is no snapshot.
    pub async fn refresh(&mut self) -> Result<SyncOutcome> {
        if self.cache.snapshot().is_none() && self.cache.load().await.is_some() {
            self.rebuild_search();
        }

        if !self.cache.has_source_changed(&self.source).await {
            tracing::debug!("source unchanged since last sync");
            return Ok(SyncOutcome::UpToDate);
        }

        let Some(last_sync) = self.cache.snapshot().map(|s| s.source_modified_at) else {
            return self.resync().await;
        };

        let source_modified_at = self.source.modified_at()?;
        let since = overlap_start(last_sync);
        let source = self.source.clone();
        let changes =
            tokio::task::spawn_blocking(move || extract_incremental(&source, since)).await??;

        let outcome = match changes {
            None => {
                self.cache.mark_synced(source_modified_at);
                SyncOutcome::Unchanged
            }
            Some(changes) => {
                let changed = changes.entries.len();
                self.cache.update_at(
                    changes.entries,
                    changes.collections,
                    Some(&changes.changed_keys),
                    source_modified_at,
                );
                SyncOutcome::Incremental { changed }
            }
        };

        self.finish_sync(outcome).await
    }

    /// Rebuild the snapshot from a full extraction.
    ///
    /// On failure the current snapshot stays in place.
    pub async fn resync(&mut self) -> Result<SyncOutcome> {
        let source_modified_at = self.source.modified_at()?;
        let source = self.source.clone();
        let extraction = tokio::task::spawn_blocking(move || extract_full(&source)).await??;

        let entries = extraction.entries.len();
        self.cache.update_at(
            extraction.entries,
            extraction.collections,
            None,
            source_modified_at,
        );
        self.finish_sync(SyncOutcome::Full { entries }).await
    }

    async fn finish_sync(&mut self, outcome: SyncOutcome) -> Result<SyncOutcome> {
        self.cache.save().await;
        if outcome != SyncOutcome::Unchanged {
            self.rebuild_search();
        }
        tracing::info!("sync of {:?}: {}", self.source.database, outcome);
        Ok(outcome)
    }

    /// Drop the snapshot, on disk and in memory
    pub async fn clear(&mut self) {
        self.cache.clear().await;
        self.rebuild_search();
    }

    pub fn entries(&self) -> &[Entry] {
        self.cache
            .snapshot()
            .map(|s| s.entries.as_slice())
            .unwrap_or_default()
    }

    pub fn entry(&self, citation_key: &str) -> Option<&Entry> {
        self.cache.snapshot().and_then(|s| s.get(citation_key))
    }

    pub fn collections(&self) -> Option<&BTreeMap<String, Collection>> {
        self.cache.snapshot().map(|s| &s.collections)
    }

    /// Collection names from the root down to `key`
    pub fn collection_path(&self, key: &str) -> Vec<String> {
        self.collections()
            .map(|collections| collection_path(key, collections))
            .unwrap_or_default()
    }

    /// Ranked search over the current snapshot
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.engine().query(query)
    }

    /// Debounced search sharing this library's index
    pub fn debounced_search(&self) -> DebouncedSearch {
        DebouncedSearch::with_shared(Arc::clone(&self.engine), self.debounce)
    }

    fn engine(&self) -> MutexGuard<'_, SearchEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rebuild_search(&self) {
        let entries = self.entries().to_vec();
        self.engine().rebuild(entries);
    }
}

/// Start of the incremental window for a sync recorded at `last_sync`
fn overlap_start(last_sync: DateTime<Utc>) -> DateTime<Utc> {
    let whole = last_sync
        .duration_trunc(ChronoDuration::seconds(1))
        .unwrap_or(last_sync);
    whole - ChronoDuration::seconds(SYNC_OVERLAP_SECS)
}
