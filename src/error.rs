//! Error types for calibrolino.
//!
//! Errors are split by how far they reach: configuration and schema errors
//! abort a catalog read, session errors abort a remote batch, and per-book
//! errors are collected and reported while the rest of the work continues.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to find the calibre library on disk.
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("could not read calibre config {path:?}: {source}")]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("calibre config {path:?} is not valid JSON: {source}")]
    ConfigInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("calibre config {path:?} has no `{key}` entry")]
    MissingLibraryPath { path: PathBuf, key: &'static str },

    #[error("could not find the calibre db at {0:?}. is calibre installed?")]
    DatabaseNotFound(PathBuf),
}

/// Fatal errors of a catalog read.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("could not open library database {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("library database has no `{0}` table")]
    MissingTable(String),

    #[error("query on `{table}` failed: {source}")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// A problem with one book found while reading the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{title} ({uuid}): {kind}")]
pub struct BookError {
    pub book_id: i64,
    pub uuid: String,
    pub title: String,
    pub kind: BookErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookErrorKind {
    FileMissing(PathBuf),
}

impl fmt::Display for BookErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookErrorKind::FileMissing(path) => write!(f, "file not found at {}", path.display()),
        }
    }
}

/// Failure signal of a single primitive call on the remote client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("remote rejected the request: {0}")]
    Rejected(String),

    #[error("remote call timed out")]
    Timeout,

    #[error("i/o error: {0}")]
    Io(String),

    #[error("no open session")]
    NotConnected,
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(e.to_string())
    }
}

/// Errors that abort a whole remote batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("fail to login: {0}")]
    Login(#[source] ClientError),

    #[error("fail to register device: {0}")]
    Registration(#[source] ClientError),

    #[error("fail to list uploaded books: {0}")]
    Listing(#[source] ClientError),
}

/// The step of a per-book upload sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    File,
    Collection,
    Cover,
    Metadata,
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStep::File => "file upload",
            UploadStep::Collection => "collection",
            UploadStep::Cover => "cover upload",
            UploadStep::Metadata => "metadata upload",
        };
        f.write_str(name)
    }
}

/// A book whose remote operations failed; the batch carried on without it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{title} ({uuid}) failed at {step}: {reason}")]
pub struct BookFailure {
    pub uuid: String,
    pub title: String,
    pub step: UploadStep,
    pub reason: String,
}
