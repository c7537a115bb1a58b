//! Stripping markdown decoration and citation markers from note lines

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Quote and list markers, then emphasis, '=' highlight marks and opening quotes
    static ref LEADING_DECORATION: Regex =
        Regex::new(r#"^(?:\s*(?:>|[-*+]\s|\d+[.)]\s))*[\s*_=“"]*"#).unwrap();

    // Emphasis, '=' highlight marks and closing quotes
    static ref TRAILING_DECORATION: Regex = Regex::new(r#"[\s*_=”"]*$"#).unwrap();
}

/// Trailing citation markers appended when notes are generated.
///
/// Two shapes are recognised, `(Smith, 2020, p. 12)` and
/// `(Smith 2020:12)`. With a non-empty disambiguator the marker must
/// contain it.
#[derive(Debug)]
pub(crate) struct CitationMarkers {
    patterns: Vec<Regex>,
}

impl CitationMarkers {
    pub fn new(disambiguator: &str) -> Self {
        let who = if disambiguator.is_empty() {
            r"[^()]+?".to_string()
        } else {
            format!(r"[^()]*?{}[^()]*?", regex::escape(disambiguator))
        };
        let sources = [
            format!(r"\s*\({who},\s*\d{{4}}[a-z]?,\s*pp?\.\s*[^()]*\)$"),
            format!(r"\s*\({who}\s\d{{4}}[a-z]?:\s*[^()\s]+\)$"),
        ];
        let patterns = sources
            .iter()
            .filter_map(|source| match Regex::new(source) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!("skipping citation marker pattern: {}", e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// Remove one trailing marker of either shape
    pub fn strip<'a>(&self, line: &'a str) -> &'a str {
        for pattern in &self.patterns {
            if let Some(m) = pattern.find(line) {
                return &line[..m.start()];
            }
        }
        line
    }
}

/// Reduce a note line to the text used for probing
pub(crate) fn strip_line<'a>(line: &'a str, markers: &CitationMarkers) -> &'a str {
    let line = strip_decoration(line);
    let line = markers.strip(line);
    strip_decoration(line)
}

fn strip_decoration(line: &str) -> &str {
    let start = LEADING_DECORATION.find(line).map_or(0, |m| m.end());
    let line = &line[start..];
    let end = TRAILING_DECORATION.find(line).map_or(line.len(), |m| m.start());
    &line[..end]
}
