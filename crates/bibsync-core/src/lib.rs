//! bibsync-core: mirror a reference database into a searchable local cache
//!
//! This library provides:
//! - Extraction of entries and collections from the reference store (full and incremental)
//! - A versioned on-disk snapshot cache with freshness checks
//! - Weighted multi-keyword search with highlight spans and debouncing
//! - Line-probing merge of regenerated note text with hand-edited notes
//! - A `Library` orchestrator tying the pieces together for a host

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod library;
pub mod merge;
pub mod search;

pub use bibsync_domain as domain;

pub use cache::{CacheStore, Snapshot, CACHE_VERSION};
pub use config::BibsyncConfig;
pub use error::{BibsyncError, CacheError, ConfigError, ExtractError, Result};
pub use extract::{
    extract_full, extract_incremental, Extraction, IncrementalExtraction, SourceStore,
};
pub use library::{Library, SyncOutcome};
pub use merge::{merge, MergeOptions, MergePolicy};
pub use search::{search, DebouncedSearch, SearchEngine, SearchField, SearchHit, Span};

/// Returns the version of bibsync-core
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
