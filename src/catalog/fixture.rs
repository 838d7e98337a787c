//! Throwaway calibre libraries for tests.

use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::locator::{LibraryLocation, DATABASE_FILE};

/// Subset of the calibre schema the catalog reader touches.
const CALIBRE_SCHEMA: &str = r#"
CREATE TABLE books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT 'Unknown',
    sort TEXT,
    timestamp TIMESTAMP,
    pubdate TIMESTAMP,
    series_index REAL NOT NULL DEFAULT 1.0,
    author_sort TEXT,
    isbn TEXT DEFAULT '',
    lccn TEXT DEFAULT '',
    path TEXT NOT NULL DEFAULT '',
    flags INTEGER NOT NULL DEFAULT 1,
    uuid TEXT,
    has_cover BOOL DEFAULT 0,
    last_modified TIMESTAMP
);
CREATE TABLE data (
    id INTEGER PRIMARY KEY,
    book INTEGER NOT NULL,
    format TEXT NOT NULL,
    uncompressed_size INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL
);
CREATE TABLE series (id INTEGER PRIMARY KEY, name TEXT NOT NULL, sort TEXT);
CREATE TABLE books_series_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, series INTEGER NOT NULL);
CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE books_tags_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, tag INTEGER NOT NULL);
CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL, sort TEXT, link TEXT NOT NULL DEFAULT '');
CREATE TABLE books_authors_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, author INTEGER NOT NULL);
CREATE TABLE publishers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, sort TEXT);
CREATE TABLE books_publishers_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, publisher INTEGER NOT NULL);
CREATE TABLE languages (id INTEGER PRIMARY KEY, lang_code TEXT NOT NULL);
CREATE TABLE books_languages_link (
    id INTEGER PRIMARY KEY,
    book INTEGER NOT NULL,
    lang_code INTEGER NOT NULL,
    item_order INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE custom_columns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL,
    name TEXT NOT NULL,
    datatype TEXT NOT NULL,
    mark_for_delete BOOL DEFAULT 0 NOT NULL,
    editable BOOL DEFAULT 1 NOT NULL,
    display TEXT DEFAULT '{}' NOT NULL,
    is_multiple BOOL DEFAULT 0 NOT NULL,
    normalized BOOL NOT NULL
);
"#;

pub(crate) struct LibraryFixture {
    // Keeps the directory alive for the duration of the test.
    _dir: TempDir,
    pub location: LibraryLocation,
    conn: Connection,
}

impl LibraryFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Calibre Library");
        fs::create_dir_all(&root).unwrap();

        let database = root.join(DATABASE_FILE);
        let conn = Connection::open(&database).unwrap();
        conn.execute_batch(CALIBRE_SCHEMA).unwrap();

        Self {
            _dir: dir,
            location: LibraryLocation { root, database },
            conn,
        }
    }

    pub fn book_folder(&self, id: i64) -> PathBuf {
        self.location.root.join("Author").join(format!("Book ({})", id))
    }

    pub fn book_file(&self, id: i64, extension: &str) -> PathBuf {
        self.book_folder(id).join(format!("Book {}.{}", id, extension))
    }

    /// Insert a book with an EPUB file present on disk.
    pub fn add_book(&self, id: i64, title: &str) {
        self.conn
            .execute(
                "INSERT INTO books (id, title, uuid, path, pubdate, isbn) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    title,
                    format!("uuid-{}", id),
                    format!("Author/Book ({})", id),
                    "2020-01-01 00:00:00+00:00",
                    format!("978000000000{}", id % 10),
                ],
            )
            .unwrap();
        fs::create_dir_all(self.book_folder(id)).unwrap();
        self.add_format(id, "EPUB");
    }

    pub fn add_format(&self, id: i64, format: &str) {
        self.conn
            .execute(
                "INSERT INTO data (book, format, name) VALUES (?, ?, ?)",
                params![id, format, format!("Book {}", id)],
            )
            .unwrap();
        fs::write(self.book_file(id, &format.to_lowercase()), b"book").unwrap();
    }

    pub fn remove_file(&self, id: i64, extension: &str) {
        fs::remove_file(self.book_file(id, extension)).unwrap();
    }

    pub fn set_cover(&self, id: i64) {
        self.conn
            .execute("UPDATE books SET has_cover = 1 WHERE id = ?", [id])
            .unwrap();
        fs::write(self.book_folder(id).join("cover.jpg"), b"jpeg").unwrap();
    }

    pub fn set_series(&self, id: i64, name: &str, index: f64) {
        self.link("series", "name", "books_series_link", "series", id, name);
        self.conn
            .execute(
                "UPDATE books SET series_index = ? WHERE id = ?",
                params![index, id],
            )
            .unwrap();
    }

    pub fn add_tag(&self, id: i64, name: &str) {
        self.link("tags", "name", "books_tags_link", "tag", id, name);
    }

    pub fn add_author(&self, id: i64, name: &str) {
        self.link("authors", "name", "books_authors_link", "author", id, name);
    }

    pub fn add_publisher(&self, id: i64, name: &str) {
        self.link("publishers", "name", "books_publishers_link", "publisher", id, name);
    }

    pub fn add_language(&self, id: i64, code: &str) {
        self.link("languages", "lang_code", "books_languages_link", "lang_code", id, code);
    }

    /// Declare a text custom column and create its tables. Returns its id.
    pub fn add_custom_column(&self, name: &str) -> i64 {
        self.conn
            .execute(
                "INSERT INTO custom_columns (label, name, datatype, normalized) VALUES (?, ?, 'enumeration', 1)",
                params![name.to_lowercase(), name],
            )
            .unwrap();
        let id = self.conn.last_insert_rowid();
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE custom_column_{id} (id INTEGER PRIMARY KEY, value TEXT NOT NULL);
                 CREATE TABLE books_custom_column_{id}_link (id INTEGER PRIMARY KEY, book INTEGER NOT NULL, value INTEGER NOT NULL);"
            ))
            .unwrap();
        id
    }

    pub fn set_custom_value(&self, column: i64, id: i64, value: &str) {
        self.link(
            &format!("custom_column_{}", column),
            "value",
            &format!("books_custom_column_{}_link", column),
            "value",
            id,
            value,
        );
    }

    /// Declare a Yes/No custom column, stored without a link table.
    pub fn add_bool_column(&self, name: &str) -> i64 {
        self.conn
            .execute(
                "INSERT INTO custom_columns (label, name, datatype, normalized) VALUES (?, ?, 'bool', 0)",
                params![name.to_lowercase(), name],
            )
            .unwrap();
        let id = self.conn.last_insert_rowid();
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE custom_column_{id} (id INTEGER PRIMARY KEY, book INTEGER, value BOOL NOT NULL, UNIQUE(book));"
            ))
            .unwrap();
        id
    }

    pub fn set_bool_value(&self, column: i64, id: i64, value: bool) {
        self.conn
            .execute(
                &format!("INSERT INTO custom_column_{} (book, value) VALUES (?, ?)", column),
                params![id, value],
            )
            .unwrap();
    }

    pub fn drop_table(&self, table: &str) {
        self.conn
            .execute_batch(&format!("DROP TABLE {}", table))
            .unwrap();
    }

    fn link(
        &self,
        table: &str,
        display_column: &str,
        link_table: &str,
        link_column: &str,
        book_id: i64,
        value: &str,
    ) {
        let existing: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT id FROM {} WHERE {} = ?", table, display_column),
                [value],
                |row| row.get(0),
            )
            .optional()
            .unwrap();
        let value_id = match existing {
            Some(id) => id,
            None => {
                self.conn
                    .execute(
                        &format!("INSERT INTO {} ({}) VALUES (?)", table, display_column),
                        [value],
                    )
                    .unwrap();
                self.conn.last_insert_rowid()
            }
        };
        self.conn
            .execute(
                &format!("INSERT INTO {} (book, {}) VALUES (?, ?)", link_table, link_column),
                params![book_id, value_id],
            )
            .unwrap();
    }
}
