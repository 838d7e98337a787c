//! Flat, denormalized view of a calibre library.
//!
//! The calibre database spreads a book over a dozen tables. The reader joins
//! them back into self-contained [`Book`] records that the sync side can send
//! without touching the database again.

pub mod reader;
pub mod schema;

#[cfg(test)]
pub(crate) mod fixture;

use std::path::PathBuf;

use crate::error::BookError;

pub use reader::{fold_links, select_variant, CatalogReader, FileVariant};
pub use schema::{CustomColumn, CustomColumnInfo, Dimension, SchemaDescriptor};

/// Name of the cover image calibre stores in every book folder.
pub const COVER_FILE: &str = "cover.jpg";

/// Series membership of a book. Name and index only exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub name: String,
    pub index: String,
}

/// One library title with all its metadata resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub isbn: String,
    pub pubdate: String,
    pub series: Option<Series>,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub publishers: Vec<String>,
    pub languages: Vec<String>,
    /// Value of the configured status custom column, if the library has one.
    pub status: Option<String>,
    /// Book file in the preferred accepted format, `None` if there is none.
    pub file_path: Option<PathBuf>,
    pub cover_path: PathBuf,
    pub has_cover: bool,
}

impl Book {
    pub fn series_name(&self) -> Option<&str> {
        self.series.as_ref().map(|s| s.name.as_str())
    }

    pub fn series_index(&self) -> Option<&str> {
        self.series.as_ref().map(|s| s.index.as_str())
    }

    /// Title as shown on the reader: prefixed with the series when there is one.
    pub fn display_title(&self) -> String {
        match &self.series {
            Some(series) => compose_series_title(&self.title, &series.index, &series.name),
            None => self.title.clone(),
        }
    }

    /// Collection labels: every tag, then the status value.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(String::as_str)
            .chain(self.status.as_deref())
    }
}

/// `"<series_name>: <series_index> - <title>"`
pub fn compose_series_title(title: &str, series_index: &str, series_name: &str) -> String {
    format!("{}: {} - {}", series_name, series_index, title)
}

/// Result of one catalog read.
///
/// `errors` lists books whose file is missing on disk. Those books stay in
/// `books`: their metadata can still be refreshed, only their upload fails.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub books: Vec<Book>,
    pub errors: Vec<BookError>,
}

impl Catalog {
    /// First book whose title contains `query`, ignoring case.
    pub fn find(&self, query: &str) -> Option<&Book> {
        let query = query.to_lowercase();
        self.books
            .iter()
            .find(|b| b.title.to_lowercase().contains(&query))
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str) -> Book {
        Book {
            id: 1,
            uuid: "u-1".to_string(),
            title: title.to_string(),
            isbn: String::new(),
            pubdate: String::new(),
            series: None,
            authors: Vec::new(),
            tags: Vec::new(),
            publishers: Vec::new(),
            languages: Vec::new(),
            status: None,
            file_path: None,
            cover_path: PathBuf::from("cover.jpg"),
            has_cover: false,
        }
    }

    #[test]
    fn test_compose_series_title() {
        let title = compose_series_title("mytitle", "42", "myserie");
        assert_eq!(title, "myserie: 42 - mytitle");

        let name_at = title.find("myserie").unwrap();
        let index_at = title.find("42").unwrap();
        let title_at = title.find("mytitle").unwrap();
        assert!(name_at < index_at && index_at < title_at);
    }

    #[test]
    fn test_series_title_scenario() {
        assert_eq!(compose_series_title("Bar", "2", "Foo"), "Foo: 2 - Bar");
    }

    #[test]
    fn test_display_title_without_series() {
        let book = book("Bar");
        assert_eq!(book.display_title(), "Bar");
        assert_eq!(book.series_index(), None);
    }

    #[test]
    fn test_display_title_with_series() {
        let mut book = book("Bar");
        book.series = Some(Series {
            name: "Foo".to_string(),
            index: "2".to_string(),
        });
        assert_eq!(book.display_title(), "Foo: 2 - Bar");
        assert_eq!(book.series_name(), Some("Foo"));
    }

    #[test]
    fn test_collections_include_status() {
        let mut book = book("Bar");
        book.tags = vec!["sf".to_string(), "classic".to_string()];
        assert_eq!(book.collections().collect::<Vec<_>>(), vec!["sf", "classic"]);

        book.status = Some("read".to_string());
        assert_eq!(
            book.collections().collect::<Vec<_>>(),
            vec!["sf", "classic", "read"]
        );
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let catalog = Catalog {
            books: vec![book("The Left Hand of Darkness"), book("Dune")],
            errors: Vec::new(),
        };
        assert_eq!(catalog.find("dune").unwrap().title, "Dune");
        assert!(catalog.find("foundation").is_none());
    }
}
