//! Raw row loading from the reference store

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::domain::{Annotation, AnnotationKind, Attachment, Collection, Creator};
use crate::error::ExtractError;

/// Timestamp layout used by the store (always UTC)
pub const SOURCE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Field name → value for one item
pub(crate) type FieldMap = BTreeMap<String, String>;

/// A top-level (non-auxiliary) item
#[derive(Debug, Clone)]
pub(crate) struct ItemRow {
    pub item_id: i64,
    pub key: String,
    pub item_type: String,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

/// Auxiliary records hanging off one item
#[derive(Debug, Clone, Default)]
pub(crate) struct ChildRecords {
    pub attachments: Vec<Attachment>,
    pub notes: Vec<String>,
    pub annotations: Vec<Annotation>,
    /// Latest creation/modification time across all children, trashed ones included
    pub latest_change: Option<DateTime<Utc>>,
}

impl ChildRecords {
    fn touch(&mut self, added: DateTime<Utc>, modified: DateTime<Utc>) {
        let latest = added.max(modified);
        self.latest_change = Some(self.latest_change.map_or(latest, |t| t.max(latest)));
    }
}

const ITEMS_SQL: &str = "
    SELECT i.itemID, i.key, it.typeName, i.dateAdded, i.dateModified
    FROM items i
    JOIN itemTypes it ON it.itemTypeID = i.itemTypeID
    WHERE it.typeName NOT IN ('attachment', 'note', 'annotation')
      AND i.itemID NOT IN (SELECT itemID FROM deletedItems)";

const CHANGED_SELF: &str = "i.dateModified > ?1 OR i.dateAdded > ?1";

const CHANGED_ATTACHMENTS: &str = "
    i.itemID IN (
        SELECT a.parentItemID FROM itemAttachments a
        JOIN items c ON c.itemID = a.itemID
        WHERE c.dateModified > ?1 OR c.dateAdded > ?1)";

const CHANGED_NOTES: &str = "
    i.itemID IN (
        SELECT n.parentItemID FROM itemNotes n
        JOIN items c ON c.itemID = n.itemID
        WHERE c.dateModified > ?1 OR c.dateAdded > ?1)";

const CHANGED_ANNOTATIONS: &str = "
    i.itemID IN (
        SELECT a.parentItemID FROM itemAnnotations an
        JOIN itemAttachments a ON a.itemID = an.parentItemID
        JOIN items c ON c.itemID = an.itemID
        WHERE c.dateModified > ?1 OR c.dateAdded > ?1)";

/// Load top-level items, optionally only those changed after `since`.
pub(crate) fn load_items(
    conn: &Connection,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<ItemRow>, ExtractError> {
    let mut sql = ITEMS_SQL.to_string();
    let mut params = Vec::new();

    if let Some(since) = since {
        let mut clauses = vec![CHANGED_SELF, CHANGED_ATTACHMENTS, CHANGED_NOTES];
        if table_exists(conn, "itemAnnotations")? {
            clauses.push(CHANGED_ANNOTATIONS);
        }
        sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        params.push(format_source_time(since));
    }
    sql.push_str(" ORDER BY i.itemID");

    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(item_id, key, item_type, added, modified)| {
            Ok(ItemRow {
                item_id,
                key,
                item_type,
                date_added: parse_source_time(&added)?,
                date_modified: parse_source_time(&modified)?,
            })
        })
        .collect()
}

/// Load every field value for the given items
pub(crate) fn load_fields(
    conn: &Connection,
    ids: &[i64],
) -> Result<HashMap<i64, FieldMap>, ExtractError> {
    let sql = format!(
        "SELECT d.itemID, f.fieldName, v.value
         FROM itemData d
         JOIN fields f ON f.fieldID = d.fieldID
         JOIN itemDataValues v ON v.valueID = d.valueID
         WHERE d.itemID IN ({})",
        id_list(ids)
    );

    let mut fields: HashMap<i64, FieldMap> = HashMap::new();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let item_id: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        if let Some(value) = value_to_string(row.get(2)?) {
            fields.entry(item_id).or_default().insert(name, value);
        }
    }
    Ok(fields)
}

/// Load creators in their display order
pub(crate) fn load_creators(
    conn: &Connection,
    ids: &[i64],
) -> Result<HashMap<i64, Vec<Creator>>, ExtractError> {
    let sql = format!(
        "SELECT ic.itemID, ct.creatorType, c.firstName, c.lastName, c.fieldMode
         FROM itemCreators ic
         JOIN creators c ON c.creatorID = ic.creatorID
         JOIN creatorTypes ct ON ct.creatorTypeID = ic.creatorTypeID
         WHERE ic.itemID IN ({})
         ORDER BY ic.itemID, ic.orderIndex",
        id_list(ids)
    );

    let mut creators: HashMap<i64, Vec<Creator>> = HashMap::new();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let item_id: i64 = row.get(0)?;
        let role: String = row.get(1)?;
        let first: Option<String> = row.get(2)?;
        let last: Option<String> = row.get(3)?;
        let field_mode: Option<i64> = row.get(4)?;

        // fieldMode 1 stores a single-field (institutional) name in lastName
        let creator = if field_mode == Some(1) {
            Creator::institution(role, last.unwrap_or_default())
        } else {
            Creator::person(role, first.unwrap_or_default(), last.unwrap_or_default())
        };
        creators.entry(item_id).or_default().push(creator);
    }
    Ok(creators)
}

/// Load tag names, alphabetically per item
pub(crate) fn load_tags(
    conn: &Connection,
    ids: &[i64],
) -> Result<HashMap<i64, Vec<String>>, ExtractError> {
    let sql = format!(
        "SELECT it.itemID, t.name
         FROM itemTags it
         JOIN tags t ON t.tagID = it.tagID
         WHERE it.itemID IN ({})
         ORDER BY it.itemID, t.name",
        id_list(ids)
    );

    let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let item_id: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        tags.entry(item_id).or_default().push(name);
    }
    Ok(tags)
}

/// Load attachments, child notes and annotations for the given parents.
///
/// Trashed children contribute their timestamps but not their content.
pub(crate) fn load_children(
    conn: &Connection,
    parent_ids: &[i64],
) -> Result<HashMap<i64, ChildRecords>, ExtractError> {
    let ids = id_list(parent_ids);
    let mut children: HashMap<i64, ChildRecords> = HashMap::new();

    let sql = format!(
        "SELECT a.parentItemID, i.key, a.contentType, a.path, i.dateAdded, i.dateModified,
                i.itemID IN (SELECT itemID FROM deletedItems),
                (SELECT v.value FROM itemData d
                 JOIN fields f ON f.fieldID = d.fieldID
                 JOIN itemDataValues v ON v.valueID = d.valueID
                 WHERE d.itemID = a.itemID AND f.fieldName = 'title')
         FROM itemAttachments a
         JOIN items i ON i.itemID = a.itemID
         WHERE a.parentItemID IN ({ids})
         ORDER BY a.parentItemID, i.itemID"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let parent: i64 = row.get(0)?;
        let record = children.entry(parent).or_default();
        record.touch(
            parse_source_time(&row.get::<_, String>(4)?)?,
            parse_source_time(&row.get::<_, String>(5)?)?,
        );
        if row.get::<_, bool>(6)? {
            continue;
        }
        record.attachments.push(Attachment {
            key: row.get(1)?,
            content_type: row.get(2)?,
            path: row.get(3)?,
            title: value_to_string(row.get(7)?),
        });
    }

    let sql = format!(
        "SELECT n.parentItemID, n.note, i.dateAdded, i.dateModified,
                i.itemID IN (SELECT itemID FROM deletedItems)
         FROM itemNotes n
         JOIN items i ON i.itemID = n.itemID
         WHERE n.parentItemID IN ({ids})
         ORDER BY n.parentItemID, i.itemID"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let parent: i64 = row.get(0)?;
        let record = children.entry(parent).or_default();
        record.touch(
            parse_source_time(&row.get::<_, String>(2)?)?,
            parse_source_time(&row.get::<_, String>(3)?)?,
        );
        if row.get::<_, bool>(4)? {
            continue;
        }
        if let Some(note) = row.get::<_, Option<String>>(1)? {
            record.notes.push(note);
        }
    }

    if !table_exists(conn, "itemAnnotations")? {
        return Ok(children);
    }

    let sql = format!(
        "SELECT a.parentItemID, i.key, p.key, an.type, an.text, an.comment, an.color,
                an.pageLabel, i.dateAdded, i.dateModified,
                i.itemID IN (SELECT itemID FROM deletedItems)
         FROM itemAnnotations an
         JOIN items i ON i.itemID = an.itemID
         JOIN itemAttachments a ON a.itemID = an.parentItemID
         JOIN items p ON p.itemID = an.parentItemID
         WHERE a.parentItemID IN ({ids})
         ORDER BY a.parentItemID, p.itemID, an.sortIndex, i.itemID"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let parent: i64 = row.get(0)?;
        let record = children.entry(parent).or_default();
        let added = parse_source_time(&row.get::<_, String>(8)?)?;
        let modified = parse_source_time(&row.get::<_, String>(9)?)?;
        record.touch(added, modified);
        if row.get::<_, bool>(10)? {
            continue;
        }
        record.annotations.push(Annotation {
            key: row.get(1)?,
            attachment_key: row.get(2)?,
            kind: AnnotationKind::from_source(row.get(3)?),
            text: row.get(4)?,
            comment: row.get(5)?,
            color: row.get(6)?,
            page_label: row.get(7)?,
            modified_at: Some(modified),
        });
    }

    Ok(children)
}

/// Load all collections with their members.
///
/// Parent links that do not resolve to a collection in the same batch are
/// dropped so the collection becomes a root.
pub(crate) fn load_collections(
    conn: &Connection,
) -> Result<BTreeMap<String, Collection>, ExtractError> {
    let trashed = if table_exists(conn, "deletedCollections")? {
        " WHERE collectionID NOT IN (SELECT collectionID FROM deletedCollections)"
    } else {
        ""
    };

    let sql = format!(
        "SELECT collectionID, key, collectionName, parentCollectionID
         FROM collections{trashed}
         ORDER BY collectionID"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let keys_by_id: HashMap<i64, String> = raw
        .iter()
        .map(|(id, key, _, _)| (*id, key.clone()))
        .collect();

    let mut collections: BTreeMap<String, Collection> = raw
        .iter()
        .map(|(_, key, name, parent)| {
            let mut collection = Collection::new(key.clone(), name.clone());
            collection.parent_key = parent.and_then(|p| keys_by_id.get(&p).cloned());
            (key.clone(), collection)
        })
        .collect();

    let mut stmt = conn.prepare("SELECT collectionID, itemID FROM collectionItems")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let collection_id: i64 = row.get(0)?;
        let item_id: i64 = row.get(1)?;
        if let Some(collection) = keys_by_id
            .get(&collection_id)
            .and_then(|key| collections.get_mut(key))
        {
            collection.member_item_ids.insert(item_id);
        }
    }

    Ok(collections)
}

pub(crate) fn table_exists(conn: &Connection, name: &str) -> Result<bool, ExtractError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn parse_source_time(raw: &str) -> Result<DateTime<Utc>, ExtractError> {
    NaiveDateTime::parse_from_str(raw.trim(), SOURCE_TIME_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| ExtractError::Read(format!("invalid timestamp {:?}: {}", raw, e)))
}

pub(crate) fn format_source_time(time: DateTime<Utc>) -> String {
    time.format(SOURCE_TIME_FORMAT).to_string()
}

/// Comma-separated integer ids for an `IN (...)` clause
fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(b) => String::from_utf8(b).ok(),
    }
}
