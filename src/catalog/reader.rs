//! Reads a calibre `metadata.db` into [`Book`] records.

use rayon::prelude::*;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use super::schema::{
    find_custom_column, CustomColumn, CustomColumnInfo, Dimension, SchemaDescriptor,
};
use super::{Book, Catalog, Series, COVER_FILE};
use crate::error::{BookError, BookErrorKind, CatalogError};
use crate::locator::LibraryLocation;

/// Book id → display values, in link-table order.
pub type DimensionValues = HashMap<i64, Vec<String>>;

/// One stored format of a book (a row of the `data` table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVariant {
    pub format: String,
    /// File name without extension.
    pub name: String,
}

impl FileVariant {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.format.to_lowercase())
    }
}

/// Row of the books table, before any join.
struct BookRow {
    id: i64,
    title: String,
    uuid: String,
    isbn: String,
    pubdate: String,
    series_index: String,
    path: String,
    has_cover: bool,
}

pub struct CatalogReader {
    conn: Connection,
    root: PathBuf,
    schema: SchemaDescriptor,
}

impl CatalogReader {
    /// Open the library database read-only.
    pub fn open(location: &LibraryLocation, schema: SchemaDescriptor) -> Result<Self, CatalogError> {
        let conn = Connection::open_with_flags(
            &location.database,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| CatalogError::Open {
            path: location.database.clone(),
            source,
        })?;

        Ok(Self {
            conn,
            root: location.root.clone(),
            schema,
        })
    }

    /// Build the catalog.
    ///
    /// `accepted_formats` is ordered by preference; `status_column` is the
    /// display name of the custom column carrying the read status. Books
    /// whose file is missing on disk are also listed in [`Catalog::errors`].
    pub fn read(
        &self,
        accepted_formats: &[String],
        status_column: &str,
    ) -> Result<Catalog, CatalogError> {
        let tables = self.table_names()?;
        for table in self.schema.required_tables() {
            if !tables.contains(table) {
                return Err(CatalogError::MissingTable(table.to_string()));
            }
        }

        let rows = self.load_books()?;
        let variants = self.load_file_variants()?;

        let series = self.fold_dimension(&self.schema.series)?;
        let tags = self.fold_dimension(&self.schema.tags)?;
        let authors = self.fold_dimension(&self.schema.authors)?;
        let publishers = self.fold_dimension(&self.schema.publishers)?;
        let languages = self.fold_dimension(&self.schema.languages)?;

        let status = match self.discover_status_column(status_column)? {
            Some(column) => self.fold_status(&column, &tables)?,
            None => {
                tracing::debug!(column = %status_column, "No status column in library");
                None
            }
        };

        let books: Vec<Book> = rows
            .into_iter()
            .map(|row| {
                let folder = self.root.join(&row.path);
                let file_path = variants
                    .get(&row.id)
                    .and_then(|v| select_variant(v, accepted_formats))
                    .map(|v| folder.join(v.file_name()));
                if file_path.is_none() {
                    tracing::warn!(book = %row.title, "No file in an accepted format");
                }

                let book_series = first_value(&series, row.id).map(|name| Series {
                    name,
                    index: row.series_index.clone(),
                });
                let book_status = status.as_ref().and_then(|s| first_value(s, row.id));

                Book {
                    id: row.id,
                    uuid: row.uuid,
                    title: row.title,
                    isbn: row.isbn,
                    pubdate: row.pubdate,
                    series: book_series,
                    authors: values(&authors, row.id),
                    tags: values(&tags, row.id),
                    publishers: values(&publishers, row.id),
                    languages: values(&languages, row.id),
                    status: book_status,
                    file_path,
                    cover_path: folder.join(COVER_FILE),
                    has_cover: row.has_cover,
                }
            })
            .collect();

        let errors: Vec<BookError> = books.par_iter().filter_map(missing_file).collect();
        for error in &errors {
            tracing::warn!(error = %error, "Book file missing");
        }
        let catalog = Catalog { books, errors };

        tracing::info!(
            books = catalog.books.len(),
            errors = catalog.errors.len(),
            "Catalog read"
        );
        Ok(catalog)
    }

    fn table_names(&self) -> Result<HashSet<String>, CatalogError> {
        let query = |source| CatalogError::Query {
            table: "sqlite_master".to_string(),
            source,
        };
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")
            .map_err(query)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query)?
            .collect::<rusqlite::Result<HashSet<_>>>()
            .map_err(query)?;
        Ok(names)
    }

    fn load_books(&self) -> Result<Vec<BookRow>, CatalogError> {
        let table = &self.schema.books_table;
        let sql = format!(
            "SELECT id, title, uuid, isbn, pubdate, series_index, path, has_cover FROM {} ORDER BY id",
            quote_ident(table)
        );
        self.query(table, &sql, |row| {
            Ok(BookRow {
                id: row.get(0)?,
                title: render_value(row.get_ref(1)?),
                uuid: render_value(row.get_ref(2)?),
                isbn: render_value(row.get_ref(3)?),
                pubdate: render_value(row.get_ref(4)?),
                series_index: render_value(row.get_ref(5)?),
                path: render_value(row.get_ref(6)?),
                has_cover: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
            })
        })
    }

    fn load_file_variants(&self) -> Result<HashMap<i64, Vec<FileVariant>>, CatalogError> {
        let table = &self.schema.data_table;
        let sql = format!("SELECT book, format, name FROM {} ORDER BY id", quote_ident(table));
        let rows = self.query(table, &sql, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                FileVariant {
                    format: render_value(row.get_ref(1)?),
                    name: render_value(row.get_ref(2)?),
                },
            ))
        })?;

        let mut variants: HashMap<i64, Vec<FileVariant>> = HashMap::new();
        for (book_id, variant) in rows {
            variants.entry(book_id).or_default().push(variant);
        }
        Ok(variants)
    }

    /// Look up the custom column named `name` and describe its storage.
    fn discover_status_column(&self, name: &str) -> Result<Option<CustomColumn>, CatalogError> {
        let table = &self.schema.custom_columns_table;
        let sql = format!(
            "SELECT id, name, datatype, normalized FROM {}",
            quote_ident(table)
        );
        let columns = self.query(table, &sql, |row| {
            Ok(CustomColumnInfo {
                id: row.get(0)?,
                name: render_value(row.get_ref(1)?),
                datatype: render_value(row.get_ref(2)?),
                normalized: row.get::<_, Option<bool>>(3)?.unwrap_or(false),
            })
        })?;

        Ok(find_custom_column(&columns, name).map(|info| {
            tracing::debug!(
                id = info.id,
                datatype = %info.datatype,
                normalized = info.normalized,
                "Status column found"
            );
            self.schema.custom_column_storage(info)
        }))
    }

    /// Values of the status column, or `None` when its tables are missing.
    fn fold_status(
        &self,
        column: &CustomColumn,
        tables: &HashSet<String>,
    ) -> Result<Option<DimensionValues>, CatalogError> {
        if let Some(missing) = column.tables().into_iter().find(|t| !tables.contains(*t)) {
            tracing::warn!(table = missing, "Status column has no table, ignoring status");
            return Ok(None);
        }
        let values = match column {
            CustomColumn::Normalized(dimension) => self.fold_dimension(dimension)?,
            CustomColumn::Direct { table, datatype } => self.fold_direct(table, datatype)?,
        };
        Ok(Some(values))
    }

    /// Fold a column stored as one `(book, value)` row per book.
    pub fn fold_direct(&self, table: &str, datatype: &str) -> Result<DimensionValues, CatalogError> {
        let sql = format!("SELECT book, value FROM {} ORDER BY rowid", quote_ident(table));
        let rows = self.query(table, &sql, |row| {
            Ok((row.get::<_, i64>(0)?, render_custom(row.get_ref(1)?, datatype)))
        })?;

        let mut values: DimensionValues = HashMap::new();
        for (book_id, value) in rows {
            if !value.is_empty() {
                values.entry(book_id).or_default().push(value);
            }
        }
        Ok(values)
    }

    /// Load a dimension's domain table and fold its link table into
    /// book id → values.
    pub fn fold_dimension(&self, dimension: &Dimension) -> Result<DimensionValues, CatalogError> {
        let names_sql = format!(
            "SELECT id, {} FROM {}",
            quote_ident(&dimension.display_column),
            quote_ident(&dimension.table)
        );
        let names: HashMap<i64, String> = self
            .query(&dimension.table, &names_sql, |row| {
                Ok((row.get::<_, i64>(0)?, render_value(row.get_ref(1)?)))
            })?
            .into_iter()
            .collect();

        let links_sql = format!(
            "SELECT book, {} FROM {} ORDER BY rowid",
            quote_ident(&dimension.link_column),
            quote_ident(&dimension.link_table)
        );
        let links = self.query(&dimension.link_table, &links_sql, |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;

        Ok(fold_links(&names, &links))
    }

    fn query<T, F>(&self, table: &str, sql: &str, map: F) -> Result<Vec<T>, CatalogError>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let error = |source| CatalogError::Query {
            table: table.to_string(),
            source,
        };
        let mut stmt = self.conn.prepare(sql).map_err(error)?;
        let rows = stmt
            .query_map([], map)
            .map_err(error)?
            .collect::<rusqlite::Result<Vec<T>>>()
            .map_err(error)?;
        Ok(rows)
    }
}

/// Fold `(book id, domain id)` link rows into book id → display values.
///
/// Links to an unknown domain id are skipped.
pub fn fold_links(names: &HashMap<i64, String>, links: &[(i64, i64)]) -> DimensionValues {
    let mut values: DimensionValues = HashMap::new();
    for (book_id, value_id) in links {
        match names.get(value_id) {
            Some(name) => values.entry(*book_id).or_default().push(name.clone()),
            None => tracing::warn!(book_id, value_id, "Link to unknown value skipped"),
        }
    }
    values
}

/// Pick the variant in the most preferred accepted format.
pub fn select_variant<'a>(
    variants: &'a [FileVariant],
    accepted_formats: &[String],
) -> Option<&'a FileVariant> {
    accepted_formats.iter().find_map(|format| {
        variants
            .iter()
            .find(|v| v.format.eq_ignore_ascii_case(format))
    })
}

fn values(map: &DimensionValues, book_id: i64) -> Vec<String> {
    map.get(&book_id).cloned().unwrap_or_default()
}

fn first_value(map: &DimensionValues, book_id: i64) -> Option<String> {
    map.get(&book_id).and_then(|v| v.first().cloned())
}

fn missing_file(book: &Book) -> Option<BookError> {
    match &book.file_path {
        Some(path) if !path.is_file() => Some(BookError {
            book_id: book.id,
            uuid: book.uuid.clone(),
            title: book.title.clone(),
            kind: BookErrorKind::FileMissing(path.clone()),
        }),
        _ => None,
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render any SQLite scalar as display text. Integral reals drop the `.0`.
fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

/// Like [`render_value`], with calibre's `Yes`/`No` for bool columns.
fn render_custom(value: ValueRef<'_>, datatype: &str) -> String {
    match (datatype, value) {
        ("bool", ValueRef::Integer(0)) => "No".to_string(),
        ("bool", ValueRef::Integer(_)) => "Yes".to_string(),
        _ => render_value(value),
    }
}
