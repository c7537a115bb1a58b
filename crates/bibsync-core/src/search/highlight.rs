//! Highlight spans

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::fields::{IndexedEntry, SearchField};
use super::score::occurrences;

/// Byte range `[start, end)` into a field's original text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Sort spans and merge the ones that overlap or touch
pub fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort();
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// Spans of every keyword occurrence, per field that contains one
pub(crate) fn field_spans(
    entry: &IndexedEntry,
    keywords: &[String],
) -> BTreeMap<SearchField, Vec<Span>> {
    let mut result = BTreeMap::new();
    for field in &entry.fields {
        let spans: Vec<Span> = keywords
            .iter()
            .flat_map(|keyword| {
                occurrences(&field.folded, keyword)
                    .map(move |start| Span::new(start, start + keyword.len()))
            })
            .collect();
        if !spans.is_empty() {
            result.insert(field.field, merge_spans(spans));
        }
    }
    result
}

/// Wrap each span of `text` in `open`/`close` markers.
///
/// Spans outside the text or off a character boundary are skipped.
pub fn render_highlighted(text: &str, spans: &[Span], open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * (open.len() + close.len()));
    let mut cursor = 0;
    for span in spans {
        if span.start < cursor
            || span.end > text.len()
            || !text.is_char_boundary(span.start)
            || !text.is_char_boundary(span.end)
        {
            continue;
        }
        out.push_str(&text[cursor..span.start]);
        out.push_str(open);
        out.push_str(&text[span.start..span.end]);
        out.push_str(close);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
