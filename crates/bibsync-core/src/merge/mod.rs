//! Merging regenerated notes with hand-edited ones
//!
//! A note is regenerated from entry metadata whenever the entry changes,
//! but users edit the previous copy. [`merge`] decides how much of the
//! existing text survives:
//!
//! - [`MergePolicy::OverwriteAll`] keeps nothing.
//! - [`MergePolicy::PreserveAll`] keeps the existing text and splices in
//!   every generated line it does not already contain.
//! - [`MergePolicy::PreserveSection`] does the same splice, then keeps only
//!   the marked section of the result and takes everything else from the
//!   generated text.
//!
//! Line matching is approximate: lines are stripped of markdown decoration
//! and trailing citation markers, then probed as whole, halves or quarters
//! depending on their length.

mod decoration;
mod reconcile;

use serde::{Deserialize, Serialize};

/// How much of an existing note survives regeneration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    OverwriteAll,
    PreserveAll,
    /// Keep the span from `start_marker` through the end of `end_marker`.
    ///
    /// An empty or missing start marker means the start of the text; an
    /// empty or missing end marker means its end.
    PreserveSection {
        start_marker: String,
        end_marker: String,
    },
}

/// Policy plus the line-matching settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    pub policy: MergePolicy,
    /// Text that appears in machine-appended citation markers
    pub author_disambiguator: String,
    /// Separate inserted lines with a blank line
    pub double_spaced: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            policy: MergePolicy::PreserveAll,
            author_disambiguator: String::new(),
            double_spaced: false,
        }
    }
}

impl MergeOptions {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

/// Combine a previously written note with freshly generated text.
///
/// An empty existing note is a first write and gets the generated text
/// unchanged, blank lines included.
pub fn merge(existing: &str, generated: &str, options: &MergeOptions) -> String {
    if existing.is_empty() || options.policy == MergePolicy::OverwriteAll {
        return generated.to_string();
    }

    let reconciled = reconcile::reconcile(
        existing,
        generated,
        &options.author_disambiguator,
        options.double_spaced,
    );

    match &options.policy {
        MergePolicy::PreserveSection {
            start_marker,
            end_marker,
        } => splice_section(&reconciled, generated, start_marker, end_marker),
        _ => reconciled,
    }
}

/// Byte range of the marked section, with whole-text defaults
fn section_bounds(text: &str, start_marker: &str, end_marker: &str) -> (usize, usize) {
    let start = if start_marker.is_empty() {
        0
    } else {
        text.find(start_marker).unwrap_or(0)
    };
    let end = if end_marker.is_empty() {
        text.len()
    } else {
        text.find(end_marker)
            .map_or(text.len(), |i| i + end_marker.len())
    };
    (start, end.max(start))
}

/// Generated text around the section kept from `existing`
fn splice_section(existing: &str, generated: &str, start_marker: &str, end_marker: &str) -> String {
    let (kept_start, kept_end) = section_bounds(existing, start_marker, end_marker);
    let (gen_start, gen_end) = section_bounds(generated, start_marker, end_marker);

    let mut result = String::with_capacity(generated.len() + kept_end - kept_start);
    result.push_str(&generated[..gen_start]);
    result.push_str(&existing[kept_start..kept_end]);
    result.push_str(&generated[gen_end..]);
    result
}
