//! Debounced interactive search

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::engine::{SearchEngine, SearchHit};

/// Default quiet interval before a submitted query is scored
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

pub type SharedResults = Arc<Vec<SearchHit>>;

/// Runs queries only after input has been quiet for `delay`.
///
/// Every [`submit`](Self::submit) supersedes the pending query and returns
/// the last published results at once. Fresh results are published through
/// a watch channel. Must be used inside a Tokio runtime.
pub struct DebouncedSearch {
    engine: Arc<Mutex<SearchEngine>>,
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    results: Arc<watch::Sender<SharedResults>>,
}

impl DebouncedSearch {
    pub fn new(engine: SearchEngine, delay: Duration) -> Self {
        Self::with_shared(Arc::new(Mutex::new(engine)), delay)
    }

    pub fn with_shared(engine: Arc<Mutex<SearchEngine>>, delay: Duration) -> Self {
        let (results, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            engine,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            results: Arc::new(results),
        }
    }

    /// The engine queries run against
    pub fn engine(&self) -> Arc<Mutex<SearchEngine>> {
        Arc::clone(&self.engine)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `query` and return the latest published results
    pub fn submit(&mut self, query: impl Into<String>) -> SharedResults {
        let generation = self.supersede();
        let query = query.into();
        let engine = Arc::clone(&self.engine);
        let current = Arc::clone(&self.generation);
        let results = Arc::clone(&self.results);
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Checked under the engine lock so a newer submit cannot slip in
            // between the check and the publish
            let mut engine = lock(&engine);
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            let hits = engine.query(&query);
            tracing::trace!(hits = hits.len(), "publishing search results");
            results.send_replace(Arc::new(hits));
        }));

        self.latest()
    }

    /// Drop the pending query, if any
    pub fn cancel(&mut self) {
        self.supersede();
    }

    /// Results of the most recent completed query
    pub fn latest(&self) -> SharedResults {
        Arc::clone(&self.results.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<SharedResults> {
        self.results.subscribe()
    }

    fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let _engine = lock(&self.engine);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

fn lock(engine: &Mutex<SearchEngine>) -> MutexGuard<'_, SearchEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}
