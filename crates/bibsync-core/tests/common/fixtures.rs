//! On-disk reference store fixtures
//!
//! Builds a minimal Zotero-layout SQLite database in a temporary directory.

#![allow(dead_code)]

use std::path::PathBuf;

use bibsync_core::SourceStore;
use rusqlite::{params, Connection, OptionalExtension};
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE itemTypes (itemTypeID INTEGER PRIMARY KEY, typeName TEXT UNIQUE);
    CREATE TABLE items (
        itemID INTEGER PRIMARY KEY,
        itemTypeID INT NOT NULL,
        dateAdded TEXT NOT NULL,
        dateModified TEXT NOT NULL,
        clientDateModified TEXT,
        libraryID INT NOT NULL DEFAULT 1,
        key TEXT NOT NULL UNIQUE
    );
    CREATE TABLE fields (fieldID INTEGER PRIMARY KEY, fieldName TEXT UNIQUE);
    CREATE TABLE itemDataValues (valueID INTEGER PRIMARY KEY, value UNIQUE);
    CREATE TABLE itemData (itemID INT, fieldID INT, valueID INT, PRIMARY KEY (itemID, fieldID));
    CREATE TABLE creatorTypes (creatorTypeID INTEGER PRIMARY KEY, creatorType TEXT UNIQUE);
    CREATE TABLE creators (creatorID INTEGER PRIMARY KEY, firstName TEXT, lastName TEXT, fieldMode INT);
    CREATE TABLE itemCreators (itemID INT, creatorID INT, creatorTypeID INT, orderIndex INT);
    CREATE TABLE tags (tagID INTEGER PRIMARY KEY, name TEXT UNIQUE);
    CREATE TABLE itemTags (itemID INT, tagID INT, type INT DEFAULT 0);
    CREATE TABLE itemAttachments (
        itemID INTEGER PRIMARY KEY,
        parentItemID INT,
        linkMode INT,
        contentType TEXT,
        path TEXT
    );
    CREATE TABLE itemNotes (itemID INTEGER PRIMARY KEY, parentItemID INT, note TEXT, title TEXT);
    CREATE TABLE itemAnnotations (
        itemID INTEGER PRIMARY KEY,
        parentItemID INT NOT NULL,
        type INT NOT NULL,
        text TEXT,
        comment TEXT,
        color TEXT,
        pageLabel TEXT,
        sortIndex TEXT NOT NULL,
        position TEXT
    );
    CREATE TABLE collections (
        collectionID INTEGER PRIMARY KEY,
        collectionName TEXT NOT NULL,
        parentCollectionID INT,
        key TEXT NOT NULL UNIQUE
    );
    CREATE TABLE collectionItems (collectionID INT, itemID INT, orderIndex INT DEFAULT 0);
    CREATE TABLE deletedItems (itemID INTEGER PRIMARY KEY, dateDeleted TEXT);
";

/// Default timestamp for fixture records
pub const T0: &str = "2024-01-01 00:00:00";

/// A Zotero-layout database in a temporary directory
pub struct ZoteroFixture {
    dir: TempDir,
    pub path: PathBuf,
    conn: Connection,
}

impl ZoteroFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zotero.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        Self { dir, path, conn }
    }

    /// Directory for caches and other side files
    pub fn dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn source(&self) -> SourceStore {
        SourceStore::new(&self.path)
    }

    fn lookup(&self, table: &str, id_column: &str, name_column: &str, name: &str) -> i64 {
        self.conn
            .execute(
                &format!("INSERT OR IGNORE INTO {table} ({name_column}) VALUES (?1)"),
                [name],
            )
            .unwrap();
        self.conn
            .query_row(
                &format!("SELECT {id_column} FROM {table} WHERE {name_column} = ?1"),
                [name],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn insert_item(&self, item_id: i64, key: &str, item_type: &str, added: &str, modified: &str) {
        let type_id = self.lookup("itemTypes", "itemTypeID", "typeName", item_type);
        self.conn
            .execute(
                "INSERT INTO items (itemID, itemTypeID, dateAdded, dateModified, clientDateModified, key)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
                params![item_id, type_id, added, modified, key],
            )
            .unwrap();
    }

    /// A top-level item with field values
    pub fn add_item(&self, item_id: i64, item_type: &str, fields: &[(&str, &str)]) {
        self.add_item_at(item_id, item_type, fields, T0, T0);
    }

    pub fn add_item_at(
        &self,
        item_id: i64,
        item_type: &str,
        fields: &[(&str, &str)],
        added: &str,
        modified: &str,
    ) {
        self.insert_item(item_id, &format!("ITEM{item_id:04}"), item_type, added, modified);
        for (name, value) in fields {
            self.set_field(item_id, name, value);
        }
    }

    pub fn set_field(&self, item_id: i64, name: &str, value: &str) {
        let field_id = self.lookup("fields", "fieldID", "fieldName", name);
        self.conn
            .execute("INSERT OR IGNORE INTO itemDataValues (value) VALUES (?1)", [value])
            .unwrap();
        let value_id: i64 = self
            .conn
            .query_row(
                "SELECT valueID FROM itemDataValues WHERE value = ?1",
                [value],
                |row| row.get(0),
            )
            .unwrap();
        self.conn
            .execute(
                "INSERT OR REPLACE INTO itemData (itemID, fieldID, valueID) VALUES (?1, ?2, ?3)",
                params![item_id, field_id, value_id],
            )
            .unwrap();
    }

    /// Set an item's modification time
    pub fn touch(&self, item_id: i64, modified: &str) {
        self.conn
            .execute(
                "UPDATE items SET dateModified = ?2, clientDateModified = ?2 WHERE itemID = ?1",
                params![item_id, modified],
            )
            .unwrap();
    }

    pub fn add_author(&self, item_id: i64, first: &str, last: &str) {
        self.add_creator(item_id, "author", Some(first), last, 0);
    }

    pub fn add_institution(&self, item_id: i64, role: &str, name: &str) {
        self.add_creator(item_id, role, None, name, 1);
    }

    fn add_creator(&self, item_id: i64, role: &str, first: Option<&str>, last: &str, mode: i64) {
        let type_id = self.lookup("creatorTypes", "creatorTypeID", "creatorType", role);
        self.conn
            .execute(
                "INSERT INTO creators (firstName, lastName, fieldMode) VALUES (?1, ?2, ?3)",
                params![first.unwrap_or(""), last, mode],
            )
            .unwrap();
        let creator_id = self.conn.last_insert_rowid();
        let order: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM itemCreators WHERE itemID = ?1",
                [item_id],
                |row| row.get(0),
            )
            .unwrap();
        self.conn
            .execute(
                "INSERT INTO itemCreators (itemID, creatorID, creatorTypeID, orderIndex)
                 VALUES (?1, ?2, ?3, ?4)",
                params![item_id, creator_id, type_id, order],
            )
            .unwrap();
    }

    pub fn add_tag(&self, item_id: i64, name: &str) {
        let tag_id = self.lookup("tags", "tagID", "name", name);
        self.conn
            .execute(
                "INSERT INTO itemTags (itemID, tagID) VALUES (?1, ?2)",
                params![item_id, tag_id],
            )
            .unwrap();
    }

    pub fn add_attachment(&self, item_id: i64, parent_id: i64, path: &str, modified: &str) {
        self.insert_item(item_id, &format!("ATTA{item_id:04}"), "attachment", T0, modified);
        self.conn
            .execute(
                "INSERT INTO itemAttachments (itemID, parentItemID, linkMode, contentType, path)
                 VALUES (?1, ?2, 0, 'application/pdf', ?3)",
                params![item_id, parent_id, path],
            )
            .unwrap();
    }

    pub fn add_note(&self, item_id: i64, parent_id: Option<i64>, note: &str, modified: &str) {
        self.insert_item(item_id, &format!("NOTE{item_id:04}"), "note", T0, modified);
        self.conn
            .execute(
                "INSERT INTO itemNotes (itemID, parentItemID, note) VALUES (?1, ?2, ?3)",
                params![item_id, parent_id, note],
            )
            .unwrap();
    }

    pub fn add_annotation(
        &self,
        item_id: i64,
        attachment_id: i64,
        text: &str,
        sort_index: &str,
        modified: &str,
    ) {
        self.insert_item(item_id, &format!("ANNO{item_id:04}"), "annotation", T0, modified);
        self.conn
            .execute(
                "INSERT INTO itemAnnotations (itemID, parentItemID, type, text, color, pageLabel, sortIndex)
                 VALUES (?1, ?2, 1, ?3, '#ffd400', '1', ?4)",
                params![item_id, attachment_id, text, sort_index],
            )
            .unwrap();
    }

    pub fn add_collection(&self, collection_id: i64, key: &str, name: &str, parent: Option<i64>) {
        self.conn
            .execute(
                "INSERT INTO collections (collectionID, collectionName, parentCollectionID, key)
                 VALUES (?1, ?2, ?3, ?4)",
                params![collection_id, name, parent, key],
            )
            .unwrap();
    }

    pub fn add_to_collection(&self, collection_id: i64, item_id: i64) {
        self.conn
            .execute(
                "INSERT INTO collectionItems (collectionID, itemID) VALUES (?1, ?2)",
                params![collection_id, item_id],
            )
            .unwrap();
    }

    pub fn trash(&self, item_id: i64) {
        self.conn
            .execute(
                "INSERT INTO deletedItems (itemID, dateDeleted) VALUES (?1, ?2)",
                params![item_id, T0],
            )
            .unwrap();
    }

    pub fn item_count(&self) -> i64 {
        self.conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .optional()
            .unwrap()
            .unwrap_or(0)
    }

    /// Write a key-manager database mapping item ids to citation keys
    pub fn key_manager(&self, keys: &[(i64, &str)]) -> PathBuf {
        let path = self.dir.path().join("better-bibtex.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS citationkey (
                itemID INTEGER PRIMARY KEY, itemKey TEXT, libraryID INT, citationKey TEXT
             );",
        )
        .unwrap();
        for (item_id, key) in keys {
            conn.execute(
                "INSERT OR REPLACE INTO citationkey (itemID, itemKey, libraryID, citationKey)
                 VALUES (?1, ?2, 1, ?3)",
                params![item_id, format!("ITEM{item_id:04}"), key],
            )
            .unwrap();
        }
        path
    }

    /// Bump the file mtime past any previous sync
    pub fn bump_mtime(&self) {
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .unwrap();
        file.set_modified(later).unwrap();
    }
}

/// Three articles, a book with a key in `extra`, a note, a trashed item
/// and an item without any resolvable key.
pub fn sample_library() -> ZoteroFixture {
    let fx = ZoteroFixture::new();

    fx.add_item(
        1,
        "journalArticle",
        &[
            ("title", "Deep learning for galaxy morphology"),
            ("publicationTitle", "Monthly Notices"),
            ("date", "2020-03-00 March 2020"),
            ("citationKey", "smith2020deep"),
            ("abstractNote", "We classify galaxies with neural networks."),
            ("DOI", "10.1000/mn.2020.1"),
        ],
    );
    fx.add_author(1, "Jane", "Smith");
    fx.add_author(1, "Wei", "Chen");
    fx.add_tag(1, "galaxies");
    fx.add_tag(1, "machine learning");

    fx.add_item(
        2,
        "journalArticle",
        &[
            ("title", "Galaxy clusters at high redshift"),
            ("publicationTitle", "Astrophysical Journal"),
            ("date", "2018-00-00 2018"),
            ("citationKey", "doe2018clusters"),
        ],
    );
    fx.add_author(2, "John", "Doe");

    fx.add_item(
        3,
        "book",
        &[
            ("title", "Statistics for Astronomers"),
            ("publisher", "Springer"),
            ("date", "2015"),
            ("extra", "Citation Key: lee2015stats\nOriginal Date: 2014"),
        ],
    );
    fx.add_institution(3, "editor", "Royal Astronomical Society");

    fx.add_item(4, "journalArticle", &[("title", "No key anywhere")]);

    fx.add_item(
        5,
        "journalArticle",
        &[("title", "Trashed paper"), ("citationKey", "trashed2021")],
    );
    fx.trash(5);

    fx.add_attachment(10, 1, "storage:smith2020.pdf", T0);
    fx.add_annotation(11, 10, "neural networks outperform", "00001|000100|00200", T0);
    fx.add_note(12, Some(1), "<p>Read this again</p>", T0);
    fx.add_note(13, None, "<p>Standalone note</p>", T0);

    fx.add_collection(1, "COLLROOT", "Astronomy", None);
    fx.add_collection(2, "COLLSUB1", "Galaxies", Some(1));
    fx.add_to_collection(2, 1);
    fx.add_to_collection(1, 3);

    fx
}
