//! Ranked search over an in-memory corpus

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::Entry;

use super::fields::{IndexedEntry, SearchField};
use super::highlight::{field_spans, Span};
use super::score::{keywords, score_entry};

/// Maximum number of hits returned for a non-empty query
pub const MAX_RESULTS: usize = 50;

/// One ranked result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entry: Arc<Entry>,
    /// Position of the entry in the corpus
    pub position: usize,
    pub score: f64,
    /// Highlight spans per matched field, into [`SearchField::text_of`]
    pub spans: BTreeMap<SearchField, Vec<Span>>,
}

/// The previous query and its untruncated match set
#[derive(Debug, Clone)]
struct LastQuery {
    normalized: String,
    keyword_count: usize,
    matched: Vec<usize>,
}

/// Search index over a corpus snapshot.
///
/// Remembers the last query so that typing further characters rescans only
/// the entries that already matched. The result is the same as a scan of the
/// whole corpus.
#[derive(Debug, Default)]
pub struct SearchEngine {
    entries: Vec<IndexedEntry>,
    last: Option<LastQuery>,
}

impl SearchEngine {
    pub fn new(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self::from_shared(entries.into_iter().map(Arc::new))
    }

    pub fn from_shared(entries: impl IntoIterator<Item = Arc<Entry>>) -> Self {
        Self {
            entries: entries.into_iter().map(IndexedEntry::new).collect(),
            last: None,
        }
    }

    /// Replace the corpus and forget the previous query
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = Entry>) {
        *self = Self::new(entries);
        tracing::debug!(entries = self.entries.len(), "rebuilt search index");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank the corpus against `raw`.
    ///
    /// An empty query returns every entry in corpus order with score 0.
    pub fn query(&mut self, raw: &str) -> Vec<SearchHit> {
        let keywords = keywords(raw);
        if keywords.is_empty() {
            self.last = None;
            return self.all_entries();
        }

        let normalized = keywords.join(" ");
        let narrowed = self.last.as_ref().and_then(|last| {
            let narrows = last.keyword_count == keywords.len()
                && last.matched.len() < self.entries.len()
                && normalized.starts_with(&last.normalized);
            narrows.then(|| last.matched.clone())
        });

        let (hits, matched) = match narrowed {
            Some(candidates) => {
                tracing::trace!(candidates = candidates.len(), "narrowed search");
                self.rank(&keywords, candidates.into_iter())
            }
            None => self.rank(&keywords, 0..self.entries.len()),
        };

        self.last = Some(LastQuery {
            normalized,
            keyword_count: keywords.len(),
            matched,
        });
        hits
    }

    /// Rank against the whole corpus, ignoring and keeping the last query
    pub fn query_full(&self, raw: &str) -> Vec<SearchHit> {
        let keywords = keywords(raw);
        if keywords.is_empty() {
            return self.all_entries();
        }
        self.rank(&keywords, 0..self.entries.len()).0
    }

    /// Score `candidates` (ascending corpus positions), sort, truncate.
    ///
    /// Also returns the untruncated matched positions in corpus order.
    fn rank(
        &self,
        keywords: &[String],
        candidates: impl Iterator<Item = usize>,
    ) -> (Vec<SearchHit>, Vec<usize>) {
        let mut scored: Vec<(usize, f64)> = candidates
            .filter_map(|position| {
                let entry = self.entries.get(position)?;
                score_entry(entry, keywords).map(|score| (position, score))
            })
            .collect();
        let matched: Vec<usize> = scored.iter().map(|(position, _)| *position).collect();

        // Stable: ties keep corpus order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(MAX_RESULTS);

        let hits = scored
            .into_iter()
            .map(|(position, score)| {
                let indexed = &self.entries[position];
                SearchHit {
                    entry: Arc::clone(&indexed.entry),
                    position,
                    score,
                    spans: field_spans(indexed, keywords),
                }
            })
            .collect();
        (hits, matched)
    }

    fn all_entries(&self) -> Vec<SearchHit> {
        self.entries
            .iter()
            .enumerate()
            .map(|(position, indexed)| SearchHit {
                entry: Arc::clone(&indexed.entry),
                position,
                score: 0.0,
                spans: BTreeMap::new(),
            })
            .collect()
    }
}

/// Rank `corpus` against `query` without keeping an index around
pub fn search(query: &str, corpus: &[Entry]) -> Vec<SearchHit> {
    SearchEngine::new(corpus.iter().cloned()).query_full(query)
}
