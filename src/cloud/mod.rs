//! E-reader cloud side: the remote client seam and the session built on it.

pub mod dry_run;
pub mod session;

use std::collections::HashMap;
use std::path::Path;

use crate::catalog::Book;
use crate::error::ClientError;

pub use dry_run::DryRunClient;
pub use session::{CloudSession, SessionBracket, SessionState, UploadReport, UploadedBook};

/// Login data for the cloud partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server_name: String,
    pub username: String,
    pub password: String,
}

/// Metadata fields sent for one uploaded book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub isbn: String,
    pub language: Option<String>,
    pub publisher: String,
    pub issued: String,
    pub author: String,
    pub tags: Vec<String>,
    pub series_name: Option<String>,
    pub status: Option<String>,
}

impl BookMetadata {
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.display_title(),
            isbn: book.isbn.clone(),
            language: book.languages.first().cloned(),
            publisher: book.publishers.join(", "),
            issued: book.pubdate.clone(),
            author: book.authors.join(", "),
            tags: book.tags.clone(),
            series_name: book.series_name().map(str::to_string),
            status: book.status.clone(),
        }
    }
}

/// Primitive operations of the remote e-reader cloud.
///
/// Implementations talk the actual wire protocol. They are not expected to be
/// safe for concurrent use; every call takes `&mut self`.
pub trait CloudClient {
    fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError>;

    fn register_device(&mut self) -> Result<(), ClientError>;

    fn unregister_device(&mut self) -> Result<(), ClientError>;

    fn logout(&mut self) -> Result<(), ClientError>;

    /// Upload a book file, returning its remote id.
    fn upload_file(&mut self, path: &Path) -> Result<String, ClientError>;

    fn add_to_collection(&mut self, remote_id: &str, label: &str) -> Result<(), ClientError>;

    fn upload_cover(&mut self, remote_id: &str, path: &Path) -> Result<(), ClientError>;

    fn upload_metadata(&mut self, remote_id: &str, fields: &BookMetadata) -> Result<(), ClientError>;

    /// Books already on the cloud, as uuid → remote id.
    fn list_registered_items(&mut self) -> Result<HashMap<String, String>, ClientError>;
}

/// Progress of a batch of per-book operations.
#[derive(Debug, Clone)]
pub enum UploadProgress {
    Started { total: usize },
    Uploading { current: usize, total: usize, title: String },
    Failed { title: String, error: String },
    Completed { succeeded: usize, failed: usize },
}
