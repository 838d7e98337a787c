//! Diffs the catalog against the cloud and drives the uploads.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc;

use crate::catalog::{Book, Catalog};
use crate::cloud::{CloudClient, CloudSession, UploadProgress, UploadReport};
use crate::error::{BookError, SessionError};

/// Which books to upload and which to refresh.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub to_upload: Vec<Book>,
    /// Books already on the cloud, with their remote id.
    pub to_refresh: Vec<(Book, String)>,
}

impl SyncPlan {
    /// Split `books` on whether their uuid is in `uploaded` (uuid → remote id).
    pub fn compute(books: &[Book], uploaded: &HashMap<String, String>) -> Self {
        let mut plan = SyncPlan::default();
        for book in books {
            match uploaded.get(&book.uuid) {
                Some(remote_id) => plan.to_refresh.push((book.clone(), remote_id.clone())),
                None => plan.to_upload.push(book.clone()),
            }
        }
        plan
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} book(s) to upload", self.to_upload.len())?;
        for book in &self.to_upload {
            writeln!(f, "  + {}", book.display_title())?;
        }
        write!(f, "{} book(s) already on the cloud", self.to_refresh.len())
    }
}

/// Outcome of a whole sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Books on the cloud whose local file is missing. Their metadata was
    /// still refreshed; missing files of new books show up in `uploaded`.
    pub catalog_errors: Vec<BookError>,
    pub uploaded: UploadReport,
    pub refreshed: UploadReport,
}

impl SyncReport {
    /// Books whose remote operations failed.
    pub fn failure_count(&self) -> usize {
        self.uploaded.failures.len() + self.refreshed.failures.len()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "uploaded: {}", self.uploaded.succeeded.len())?;
        writeln!(f, "metadata refreshed: {}", self.refreshed.succeeded.len())?;
        write!(f, "failed: {}", self.failure_count())?;
        for failure in self.uploaded.failures.iter().chain(&self.refreshed.failures) {
            write!(f, "\n  - {}", failure)?;
        }
        if !self.catalog_errors.is_empty() {
            write!(f, "\nmissing local files: {}", self.catalog_errors.len())?;
            for error in &self.catalog_errors {
                write!(f, "\n  - {}", error)?;
            }
        }
        Ok(())
    }
}

/// Upload new books and refresh the metadata of those already on the cloud.
///
/// Everything runs in one session. A login, registration or listing failure
/// aborts the run before any book is touched; book failures are collected in
/// the report.
pub fn run_sync<C: CloudClient>(
    session: &mut CloudSession<C>,
    catalog: &Catalog,
    progress: Option<&mpsc::Sender<UploadProgress>>,
) -> Result<SyncReport, SessionError> {
    let mut bracket = session.open()?;
    let uploaded = bracket.list_registered_items()?;
    let plan = SyncPlan::compute(&catalog.books, &uploaded);
    tracing::info!(
        upload = plan.to_upload.len(),
        refresh = plan.to_refresh.len(),
        "Sync planned"
    );

    let mut report = SyncReport {
        catalog_errors: catalog
            .errors
            .iter()
            .filter(|e| uploaded.contains_key(&e.uuid))
            .cloned()
            .collect(),
        ..Default::default()
    };
    if !plan.to_upload.is_empty() {
        report.uploaded = bracket.upload_books(&plan.to_upload, progress);
    }
    if !plan.to_refresh.is_empty() {
        report.refreshed = bracket.refresh_books(&plan.to_refresh, progress);
    }
    drop(bracket);

    tracing::info!(
        uploaded = report.uploaded.succeeded.len(),
        refreshed = report.refreshed.succeeded.len(),
        failed = report.failure_count(),
        "Sync finished"
    );
    Ok(report)
}

/// Upload one book, or refresh it if the cloud already has it.
pub fn sync_one<C: CloudClient>(
    session: &mut CloudSession<C>,
    book: &Book,
) -> Result<UploadReport, SessionError> {
    let mut bracket = session.open()?;
    let uploaded = bracket.list_registered_items()?;
    let mut report = UploadReport::default();
    match uploaded.get(&book.uuid) {
        Some(remote_id) => report.record(bracket.refresh_book(book, remote_id)),
        None => report.record(bracket.upload_book(book)),
    }
    Ok(report)
}
