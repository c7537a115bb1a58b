//! Keyword scoring

use super::fields::{FieldText, IndexedEntry};

/// Multiplier for a match delimited by token boundaries on both sides
pub const BOUNDARY_BONUS: f64 = 1.5;

/// Multiplier for a match at offset 0 of a title or author field
pub const LEADING_BONUS: f64 = 2.0;

/// Multiplier when every keyword of a multi-keyword query matched
pub const ALL_KEYWORDS_BONUS: f64 = 1.5;

/// Split a query into folded keywords
pub fn keywords(query: &str) -> Vec<String> {
    super::fields::fold(query.trim())
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Start offsets of every occurrence of `needle`, overlaps included
pub(crate) fn occurrences<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    let step = needle.chars().next().map_or(1, char::len_utf8);
    let mut from = 0;
    std::iter::from_fn(move || {
        if needle.is_empty() || from > haystack.len() {
            return None;
        }
        let found = from + haystack[from..].find(needle)?;
        from = found + step;
        Some(found)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when the characters around `text[start..end]`, if any, are not
/// word characters
fn at_token_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Score of the best occurrence of `keyword` in one field, 0 when absent
pub(crate) fn field_score(field: &FieldText, keyword: &str) -> f64 {
    let weight = field.field.weight();
    occurrences(&field.folded, keyword)
        .map(|start| {
            let mut score = weight;
            if at_token_boundary(&field.folded, start, start + keyword.len()) {
                score *= BOUNDARY_BONUS;
            }
            if start == 0 && field.field.rewards_leading_match() {
                score *= LEADING_BONUS;
            }
            score
        })
        .fold(0.0, f64::max)
}

/// Total score of an entry, or `None` when no keyword matched
pub(crate) fn score_entry(entry: &IndexedEntry, keywords: &[String]) -> Option<f64> {
    let mut total = 0.0;
    let mut matched = 0;

    for keyword in keywords {
        let keyword_score: f64 = entry.fields.iter().map(|f| field_score(f, keyword)).sum();
        if keyword_score > 0.0 {
            total += keyword_score;
            matched += 1;
        }
    }

    if matched == 0 {
        return None;
    }
    if keywords.len() > 1 && matched == keywords.len() {
        total *= ALL_KEYWORDS_BONUS;
    }
    Some(total)
}
