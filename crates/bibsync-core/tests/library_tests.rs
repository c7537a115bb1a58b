//! End-to-end sync tests through the Library orchestrator

mod common;

use std::time::Duration;

use bibsync_core::{BibsyncConfig, Library, SyncOutcome};
use common::fixtures::sample_library;

fn keys(library: &Library) -> Vec<String> {
    library
        .entries()
        .iter()
        .map(|e| e.citation_key.clone())
        .collect()
}

#[tokio::test]
async fn test_first_refresh_is_full_then_up_to_date() {
    let fx = sample_library();
    let mut library = Library::new(fx.source(), fx.cache_dir());

    assert_eq!(
        library.refresh().await.unwrap(),
        SyncOutcome::Full { entries: 3 }
    );
    assert!(library.cache().cache_path().exists());
    assert_eq!(library.search("galax").len(), 2);

    assert_eq!(library.refresh().await.unwrap(), SyncOutcome::UpToDate);
}

#[tokio::test]
async fn test_changed_entry_is_synced_incrementally() {
    let fx = sample_library();
    let mut library = Library::new(fx.source(), fx.cache_dir());
    library.refresh().await.unwrap();

    fx.set_field(2, "title", "Galaxy clusters revisited");
    fx.touch(2, "2099-01-01 00:00:00");
    fx.bump_mtime();

    assert_eq!(
        library.refresh().await.unwrap(),
        SyncOutcome::Incremental { changed: 1 }
    );
    assert_eq!(
        library.entry("doe2018clusters").unwrap().title,
        "Galaxy clusters revisited"
    );
    // Position in the corpus is kept
    assert_eq!(keys(&library)[1], "doe2018clusters");
    assert_eq!(library.search("revisited").len(), 1);
}

#[tokio::test]
async fn test_touched_file_without_entry_changes() {
    let fx = sample_library();
    let mut library = Library::new(fx.source(), fx.cache_dir());
    library.refresh().await.unwrap();

    fx.bump_mtime();
    assert_eq!(library.refresh().await.unwrap(), SyncOutcome::Unchanged);
    assert_eq!(library.refresh().await.unwrap(), SyncOutcome::UpToDate);
}

#[tokio::test]
async fn test_new_session_reuses_cache() {
    let fx = sample_library();
    {
        let mut library = Library::new(fx.source(), fx.cache_dir());
        library.refresh().await.unwrap();
    }

    let mut library = Library::new(fx.source(), fx.cache_dir());
    assert!(library.entries().is_empty());
    assert_eq!(library.refresh().await.unwrap(), SyncOutcome::UpToDate);
    assert_eq!(
        keys(&library),
        vec!["smith2020deep", "doe2018clusters", "lee2015stats"]
    );
    assert_eq!(library.search("springer").len(), 1);
}

#[tokio::test]
async fn test_resync_prunes_removed_entries() {
    let fx = sample_library();
    let mut library = Library::new(fx.source(), fx.cache_dir());
    library.refresh().await.unwrap();

    fx.trash(2);
    assert_eq!(
        library.resync().await.unwrap(),
        SyncOutcome::Full { entries: 2 }
    );
    assert!(library.entry("doe2018clusters").is_none());
}

#[tokio::test]
async fn test_failed_resync_keeps_snapshot() {
    let fx = sample_library();
    let mut library = Library::new(fx.source(), fx.cache_dir());
    library.refresh().await.unwrap();

    std::fs::write(&fx.path, b"corrupted beyond repair, definitely not sqlite").unwrap();
    assert!(library.resync().await.is_err());
    assert_eq!(library.entries().len(), 3);
    assert_eq!(library.search("galax").len(), 2);
}

#[tokio::test]
async fn test_collections_and_lookup() {
    let fx = sample_library();
    let mut library = Library::new(fx.source(), fx.cache_dir());
    library.refresh().await.unwrap();

    assert_eq!(library.collection_path("COLLSUB1"), vec!["Astronomy", "Galaxies"]);
    assert!(library.collection_path("NOPE").is_empty());
    assert_eq!(library.collections().unwrap().len(), 2);
    assert_eq!(library.entry("lee2015stats").unwrap().year, Some(2015));
}

#[tokio::test]
async fn test_open_from_config() {
    let fx = sample_library();
    let toml = format!(
        "[source]\ndatabase = {:?}\n\n[cache]\ndir = {:?}\n\n[search]\ndebounce_ms = 20\n",
        fx.path.display().to_string(),
        fx.cache_dir().display().to_string(),
    );
    let config = BibsyncConfig::from_toml_str(&toml).unwrap();
    let mut library = Library::open(&config);
    library.refresh().await.unwrap();

    let mut search = library.debounced_search();
    assert_eq!(search.delay(), Duration::from_millis(20));
    assert!(search.submit("statistics").is_empty());
    tokio::time::sleep(Duration::from_millis(200)).await;
    let latest = search.latest();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].entry.citation_key, "lee2015stats");
}

#[tokio::test]
async fn test_clear_drops_everything() {
    let fx = sample_library();
    let mut library = Library::new(fx.source(), fx.cache_dir());
    library.refresh().await.unwrap();

    library.clear().await;
    assert!(library.entries().is_empty());
    assert!(library.search("").is_empty());
    assert!(!library.cache().cache_path().exists());
}
