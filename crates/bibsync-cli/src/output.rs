//! Terminal rendering for search hits and collections

use std::collections::BTreeMap;

use bibsync_core::search::render_highlighted;
use bibsync_core::SearchHit;
use bibsync_domain::{collection_path, Collection};

const HIGHLIGHT_OPEN: &str = "\x1b[1;33m";
const HIGHLIGHT_CLOSE: &str = "\x1b[0m";

/// Markers wrapped around matched text
#[derive(Debug, Clone, Copy)]
pub struct Markers {
    pub open: &'static str,
    pub close: &'static str,
}

impl Markers {
    pub fn ansi() -> Self {
        Self {
            open: HIGHLIGHT_OPEN,
            close: HIGHLIGHT_CLOSE,
        }
    }

    pub fn plain() -> Self {
        Self {
            open: "[",
            close: "]",
        }
    }
}

/// One block per hit: key and score, then every matched field
pub fn format_hit(hit: &SearchHit, markers: Markers) -> String {
    let mut out = format!("{:>6.1}  {}", hit.score, hit.entry.citation_key);
    if hit.spans.is_empty() {
        out.push_str(&format!("  {}", hit.entry.title));
        return out;
    }
    for (field, spans) in &hit.spans {
        let text = field.text_of(&hit.entry);
        let rendered = render_highlighted(&text, spans, markers.open, markers.close);
        out.push_str(&format!("\n        {:<12} {}", field.label(), rendered));
    }
    out
}

/// Machine-readable form of a hit list
pub fn hits_to_json(hits: &[SearchHit]) -> serde_json::Value {
    hits.iter()
        .map(|hit| {
            serde_json::json!({
                "citation_key": hit.entry.citation_key,
                "title": hit.entry.title,
                "score": hit.score,
                "spans": hit.spans,
            })
        })
        .collect()
}

/// "Parent / Child  (n items)" lines, sorted by path
pub fn collection_lines(collections: &BTreeMap<String, Collection>) -> Vec<String> {
    let mut lines: Vec<(String, usize)> = collections
        .values()
        .map(|c| {
            (
                collection_path(&c.key, collections).join(" / "),
                c.member_item_ids.len(),
            )
        })
        .collect();
    lines.sort();
    lines
        .into_iter()
        .map(|(path, count)| format!("{path}  ({count} items)"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibsync_core::domain::{Creator, Entry};
    use bibsync_core::search;

    fn corpus() -> Vec<Entry> {
        let mut entry = Entry::new(
            "smith2020deep".to_string(),
            "journalArticle".to_string(),
            "Deep learning for galaxy morphology".to_string(),
        );
        entry.creators = vec![Creator::person("author", "Jane", "Smith")];
        vec![entry]
    }

    #[test]
    fn test_format_hit_marks_matches() {
        let hits = search("galaxy smith", &corpus());
        let text = format_hit(&hits[0], Markers::plain());
        assert!(text.contains("smith2020deep"));
        assert!(text.contains("Deep learning for [galaxy] morphology"));
        assert!(text.contains("Jane [Smith]"));
    }

    #[test]
    fn test_empty_query_prints_title() {
        let hits = search("", &corpus());
        let text = format_hit(&hits[0], Markers::plain());
        assert!(text.ends_with("Deep learning for galaxy morphology"));
    }

    #[test]
    fn test_hits_to_json() {
        let hits = search("galaxy", &corpus());
        let json = hits_to_json(&hits);
        assert_eq!(json[0]["citation_key"], "smith2020deep");
        assert_eq!(json[0]["spans"]["title"][0], serde_json::json!({"start": 18, "end": 24}));
    }

    #[test]
    fn test_collection_lines() {
        let mut collections = BTreeMap::new();
        let mut root = Collection::new("R", "Astronomy");
        root.member_item_ids.insert(1);
        collections.insert("R".to_string(), root);
        collections.insert("S".to_string(), Collection::new("S", "Galaxies").with_parent("R"));

        assert_eq!(
            collection_lines(&collections),
            vec!["Astronomy  (1 items)", "Astronomy / Galaxies  (0 items)"]
        );
    }
}
