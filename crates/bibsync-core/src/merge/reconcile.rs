//! Line reconciliation
//!
//! Every generated line is probed against the existing text. Lines that
//! cannot be found are spliced in after the line holding the most recent
//! found line, so hand-written material around them keeps its place.
//! Before any line has been found the anchor is the start of the text, so
//! those lines land after the first existing line.

use super::decoration::{strip_line, CitationMarkers};

/// Lines shorter than this many characters are probed whole
const WHOLE_PROBE_LIMIT: usize = 30;

/// Lines shorter than this are probed in halves, longer ones in quarters
const HALF_PROBE_LIMIT: usize = 150;

/// A generated line missing from the existing text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Insertion<'a> {
    /// Byte offset in the existing text
    position: usize,
    line_index: usize,
    text: &'a str,
}

/// Add every generated line missing from `existing` next to its context
pub(crate) fn reconcile(
    existing: &str,
    generated: &str,
    disambiguator: &str,
    double_spaced: bool,
) -> String {
    let markers = CitationMarkers::new(disambiguator);
    let mut anchor = 0;
    let mut insertions = Vec::new();

    for (line_index, raw) in generated.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let stripped = strip_line(line, &markers);
        if stripped.chars().count() < 2 {
            continue;
        }

        match find_line(existing, stripped) {
            Some(offset) => anchor = offset,
            None => insertions.push(Insertion {
                position: line_break_after(existing, anchor),
                line_index,
                text: line,
            }),
        }
    }

    if insertions.is_empty() {
        return existing.to_string();
    }
    tracing::debug!(inserted = insertions.len(), "reconciled generated lines");

    let separator = if double_spaced { "\n\n" } else { "\n" };
    let mut result = existing.to_string();

    // Back to front, so earlier offsets stay valid
    insertions.sort_by_key(|i| (i.position, i.line_index));
    for insertion in insertions.iter().rev() {
        result.insert_str(insertion.position, &format!("{}{}", separator, insertion.text));
    }
    result
}

/// Offset of the line in `existing`, taken as the furthest probe found.
///
/// Short lines are probed whole; longer ones in halves or quarters, and
/// any probe being present counts as found.
pub(crate) fn find_line(existing: &str, stripped: &str) -> Option<usize> {
    probes(stripped)
        .into_iter()
        .filter_map(|probe| existing.find(probe))
        .max()
}

/// Split a line into its probe substrings by character count
pub(crate) fn probes(line: &str) -> Vec<&str> {
    let length = line.chars().count();
    let parts = if length < WHOLE_PROBE_LIMIT {
        1
    } else if length < HALF_PROBE_LIMIT {
        2
    } else {
        4
    };

    let size = length / parts;
    let bounds: Vec<usize> = line
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(line.len()))
        .collect();

    (0..parts)
        .map(|part| {
            let start = bounds[part * size];
            let end = if part + 1 == parts {
                line.len()
            } else {
                bounds[(part + 1) * size]
            };
            &line[start..end]
        })
        .collect()
}

/// Offset of the first line break at or after `offset`, or the text end
fn line_break_after(text: &str, offset: usize) -> usize {
    text[offset..].find('\n').map_or(text.len(), |i| offset + i)
}
