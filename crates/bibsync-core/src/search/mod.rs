//! Weighted multi-keyword search
//!
//! Every entry is indexed by a handful of fields, each kept in original and
//! case-folded form with identical byte offsets. A query is folded and split
//! into keywords; each keyword scores the best occurrence per field:
//!
//! | Field        | Weight |
//! |--------------|--------|
//! | Title        | 10     |
//! | Author       | 8      |
//! | Venue        | 6      |
//! | Citation key | 5      |
//! | Tags         | 4      |
//! | Date         | 3      |
//! | Abstract     | 2      |
//!
//! ×1.5 for a whole-token match, ×2 for a match at the very start of the
//! title or author field, and ×1.5 on the entry total when every keyword of
//! a multi-keyword query matched. Hits are sorted by score, ties in corpus
//! order, and capped at [`MAX_RESULTS`].

mod debounce;
mod engine;
mod fields;
mod highlight;
mod score;

pub use debounce::{DebouncedSearch, SharedResults, DEFAULT_DEBOUNCE};
pub use engine::{search, SearchEngine, SearchHit, MAX_RESULTS};
pub use fields::{fold, SearchField};
pub use highlight::{merge_spans, render_highlighted, Span};
pub use score::keywords;
