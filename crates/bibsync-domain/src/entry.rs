//! Entry domain model

use super::{flatten_creators, Annotation, Attachment, Creator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One bibliographic record mirrored from the reference store.
///
/// Source fields promoted to typed attributes are removed from
/// `extra_fields`; everything else lands there verbatim so nothing is lost.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub citation_key: String,
    pub item_id: i64,
    pub item_key: String,
    pub item_type: String,
    pub title: String,
    pub creators: Vec<Creator>,
    pub venue: Option<String>,
    pub date: Option<String>,
    pub year: Option<i32>,
    pub abstract_text: Option<String>,
    pub tags: Vec<String>,

    // Metadata
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    // Auxiliary records
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub collections: Vec<String>,

    // Additional source fields (catch-all)
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
}

impl Entry {
    /// Create a new entry with required fields
    pub fn new(citation_key: String, item_type: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            citation_key,
            item_id: 0,
            item_key: String::new(),
            item_type,
            title,
            creators: Vec::new(),
            venue: None,
            date: None,
            year: None,
            abstract_text: None,
            tags: Vec::new(),
            created_at: now,
            modified_at: now,
            attachments: Vec::new(),
            notes: Vec::new(),
            annotations: Vec::new(),
            collections: Vec::new(),
            extra_fields: BTreeMap::new(),
        }
    }

    /// Add a tag, keeping `tags` free of duplicates
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Creator display names joined for display and search
    pub fn author_string(&self) -> String {
        flatten_creators(&self.creators)
    }

    /// Latest of creation and modification time
    pub fn last_change(&self) -> DateTime<Utc> {
        self.created_at.max(self.modified_at)
    }

    /// True when the entry was created or modified strictly after `since`
    pub fn changed_since(&self, since: DateTime<Utc>) -> bool {
        self.last_change() > since
    }

    /// Get a field value by name (case-insensitive for typed fields)
    pub fn get_field(&self, name: &str) -> Option<String> {
        match name.to_lowercase().as_str() {
            "citationkey" | "citekey" => Some(self.citation_key.clone()),
            "itemtype" => Some(self.item_type.clone()),
            "title" => Some(self.title.clone()),
            "authors" | "creators" => Some(self.author_string()).filter(|s| !s.is_empty()),
            "venue" | "publicationtitle" => self.venue.clone(),
            "date" => self.date.clone(),
            "year" => self.year.map(|y| y.to_string()),
            "abstract" | "abstractnote" => self.abstract_text.clone(),
            "tags" => Some(self.tags.join(", ")).filter(|s| !s.is_empty()),
            _ => self.extra_fields.get(name).cloned(),
        }
    }
}

/// Split a source date into its display part and year.
///
/// The store keeps dates as `"YYYY-MM-DD original"` where unknown parts are
/// zero (`"2020-03-00 March 2020"`). Plain dates are returned as-is with the
/// year taken from the first four-digit run.
pub fn split_source_date(raw: &str) -> (String, Option<i32>) {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    let is_sql_prefix = bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit);

    if is_sql_prefix {
        let year = raw[..4].parse().ok().filter(|y| *y != 0);
        let display = raw[10..].trim();
        let display = if display.is_empty() { &raw[..10] } else { display };
        return (display.to_string(), year);
    }

    (raw.to_string(), first_year(raw))
}

fn first_year(text: &str) -> Option<i32> {
    let mut run = 0;
    for (i, c) in text.char_indices() {
        if c.is_ascii_digit() {
            run += 1;
            let next_is_digit = text[i + 1..]
                .chars()
                .next()
                .is_some_and(|n| n.is_ascii_digit());
            if run == 4 && !next_is_digit {
                return text[i - 3..=i].parse().ok();
            }
        } else {
            run = 0;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn test_entry_new() {
        let entry = Entry::new(
            "einstein1905".to_string(),
            "journalArticle".to_string(),
            "On the Electrodynamics of Moving Bodies".to_string(),
        );
        assert_eq!(entry.citation_key, "einstein1905");
        assert_eq!(entry.item_type, "journalArticle");
        assert!(entry.creators.is_empty());
    }

    #[test]
    fn test_add_tag_dedupes() {
        let mut entry = Entry::new("k".into(), "book".into(), "T".into());
        entry.add_tag("physics");
        entry.add_tag("physics");
        entry.add_tag("");
        assert_eq!(entry.tags, vec!["physics"]);
    }

    #[test]
    fn test_changed_since() {
        let mut entry = Entry::new("k".into(), "book".into(), "T".into());
        entry.created_at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        entry.modified_at = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();

        assert!(entry.changed_since(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()));
        assert!(!entry.changed_since(entry.modified_at));
    }

    #[test]
    fn test_get_field() {
        let mut entry = Entry::new("smith2020".into(), "journalArticle".into(), "T".into());
        entry.creators.push(Creator::person("author", "Jane", "Smith"));
        entry.extra_fields.insert("DOI".into(), "10.1234/x".into());

        assert_eq!(entry.get_field("citekey"), Some("smith2020".to_string()));
        assert_eq!(entry.get_field("authors"), Some("Jane Smith".to_string()));
        assert_eq!(entry.get_field("DOI"), Some("10.1234/x".to_string()));
        assert_eq!(entry.get_field("tags"), None);
    }

    #[rstest]
    #[case("2020-03-00 March 2020", "March 2020", Some(2020))]
    #[case("2019-00-00 2019", "2019", Some(2019))]
    #[case("2018-05-04", "2018-05-04", Some(2018))]
    #[case("Spring 1999", "Spring 1999", Some(1999))]
    #[case("0000-00-00 n.d.", "n.d.", None)]
    #[case("undated", "undated", None)]
    fn test_split_source_date(
        #[case] raw: &str,
        #[case] display: &str,
        #[case] year: Option<i32>,
    ) {
        assert_eq!(split_source_date(raw), (display.to_string(), year));
    }

    #[test]
    fn test_entry_serde_defaults() {
        let entry = Entry::new("k".into(), "book".into(), "T".into());
        let mut value = serde_json::to_value(&entry).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove("attachments");
        object.remove("extra_fields");
        let back: Entry = serde_json::from_value(value).unwrap();
        assert!(back.attachments.is_empty());
        assert!(back.extra_fields.is_empty());
    }
}
