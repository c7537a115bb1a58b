//! Searchable fields and their precomputed text

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{flatten_creators, Entry};

/// A searchable entry field, in descending weight order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Author,
    Venue,
    CitationKey,
    Tags,
    Date,
    Abstract,
}

impl SearchField {
    pub const ALL: [SearchField; 7] = [
        SearchField::Title,
        SearchField::Author,
        SearchField::Venue,
        SearchField::CitationKey,
        SearchField::Tags,
        SearchField::Date,
        SearchField::Abstract,
    ];

    /// Base score for a keyword occurring in this field
    pub fn weight(self) -> f64 {
        match self {
            SearchField::Title => 10.0,
            SearchField::Author => 8.0,
            SearchField::Venue => 6.0,
            SearchField::CitationKey => 5.0,
            SearchField::Tags => 4.0,
            SearchField::Date => 3.0,
            SearchField::Abstract => 2.0,
        }
    }

    /// Whether a match at offset 0 earns the leading-match bonus
    pub fn rewards_leading_match(self) -> bool {
        matches!(self, SearchField::Title | SearchField::Author)
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Author => "author",
            SearchField::Venue => "venue",
            SearchField::CitationKey => "citation key",
            SearchField::Tags => "tags",
            SearchField::Date => "date",
            SearchField::Abstract => "abstract",
        }
    }

    /// The original-case text searched for this field.
    ///
    /// Highlight spans of a hit are byte ranges into this string.
    pub fn text_of(self, entry: &Entry) -> String {
        match self {
            SearchField::Title => entry.title.clone(),
            SearchField::Author => flatten_creators(&entry.creators),
            SearchField::Venue => entry.venue.clone().unwrap_or_default(),
            SearchField::CitationKey => entry.citation_key.clone(),
            SearchField::Tags => entry.tags.join(", "),
            SearchField::Date => match (&entry.date, entry.year) {
                (Some(date), _) => date.clone(),
                (None, Some(year)) => year.to_string(),
                (None, None) => String::new(),
            },
            SearchField::Abstract => entry.abstract_text.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercase `text` without moving any byte offsets.
///
/// Characters whose lowercase form is a single character of the same UTF-8
/// length are folded; all others are kept as-is. Offsets found in the
/// folded string are therefore valid in the original.
///
/// The few characters whose lowercase form changes length (`ẞ`, `İ`, the
/// Kelvin sign `K`) stay unfolded, so matching them is case-sensitive.
pub fn fold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) if l.len_utf8() == c.len_utf8() => folded.push(l),
            _ => folded.push(c),
        }
    }
    folded
}

/// Original and folded text of one field
#[derive(Debug, Clone)]
pub(crate) struct FieldText {
    pub field: SearchField,
    pub original: String,
    pub folded: String,
}

/// An entry with its searchable fields precomputed
#[derive(Debug, Clone)]
pub(crate) struct IndexedEntry {
    pub entry: Arc<Entry>,
    pub fields: Vec<FieldText>,
}

impl IndexedEntry {
    pub fn new(entry: Arc<Entry>) -> Self {
        let fields = SearchField::ALL
            .iter()
            .filter_map(|&field| {
                let original = field.text_of(&entry);
                if original.is_empty() {
                    return None;
                }
                let folded = fold(&original);
                Some(FieldText {
                    field,
                    original,
                    folded,
                })
            })
            .collect();
        Self { entry, fields }
    }
}
