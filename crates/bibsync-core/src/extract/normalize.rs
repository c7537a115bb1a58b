//! Record normalization: raw rows → Entry

use std::collections::BTreeMap;

use crate::domain::{collections_for_item, split_source_date, Collection, Creator, Entry};

use super::rows::{ChildRecords, FieldMap, ItemRow};

/// Fields that hold the title for item types without a plain `title`
const TITLE_FIELDS: &[&str] = &["title", "caseName", "nameOfAct", "subject"];

/// Fields that can carry the venue, in order of preference
const VENUE_FIELDS: &[&str] = &[
    "publicationTitle",
    "bookTitle",
    "proceedingsTitle",
    "conferenceName",
    "websiteTitle",
    "blogTitle",
    "forumTitle",
    "programTitle",
    "encyclopediaTitle",
    "dictionaryTitle",
    "university",
    "publisher",
];

/// Everything needed to build one entry
pub(crate) struct EntryParts<'a> {
    pub citation_key: String,
    pub item: ItemRow,
    pub fields: FieldMap,
    pub creators: Vec<Creator>,
    pub tags: Vec<String>,
    pub children: ChildRecords,
    pub collections: &'a BTreeMap<String, Collection>,
}

/// Promote known fields to typed attributes; keep the rest in `extra_fields`.
pub(crate) fn build_entry(parts: EntryParts<'_>) -> Entry {
    let EntryParts {
        citation_key,
        item,
        mut fields,
        creators,
        tags,
        children,
        collections,
    } = parts;

    let title = take_first(&mut fields, TITLE_FIELDS).unwrap_or_default();
    let venue = take_first(&mut fields, VENUE_FIELDS);
    let (date, year) = match fields.remove("date") {
        Some(raw) => {
            let (display, year) = split_source_date(&raw);
            (Some(display).filter(|d| !d.is_empty()), year)
        }
        None => (None, None),
    };
    let abstract_text = fields.remove("abstractNote").filter(|a| !a.trim().is_empty());
    fields.remove("citationKey");

    let modified_at = children
        .latest_change
        .map_or(item.date_modified, |child| child.max(item.date_modified));

    let mut entry = Entry::new(citation_key, item.item_type, title);
    entry.item_id = item.item_id;
    entry.item_key = item.key;
    entry.creators = creators;
    entry.venue = venue;
    entry.date = date;
    entry.year = year;
    entry.abstract_text = abstract_text;
    entry.created_at = item.date_added;
    entry.modified_at = modified_at;
    entry.attachments = children.attachments;
    entry.notes = children.notes;
    entry.annotations = children.annotations;
    entry.collections = collections_for_item(item.item_id, collections);
    entry.extra_fields = fields;
    for tag in tags {
        entry.add_tag(tag);
    }
    entry
}

/// Remove and return the first non-empty field among `names`.
///
/// Later candidates stay in the map so no value is lost.
fn take_first(fields: &mut FieldMap, names: &[&str]) -> Option<String> {
    let name = names
        .iter()
        .find(|name| fields.get(**name).is_some_and(|v| !v.trim().is_empty()))?;
    fields.remove(*name)
}
