//! Login/registration bracketed session on top of a [`CloudClient`].
//!
//! Every remote batch runs inside a [`SessionBracket`]: opening it logs in and
//! registers the device, dropping it unregisters and logs out. Per-book
//! failures inside the bracket are collected in an [`UploadReport`] and never
//! end the batch early.

use std::collections::HashMap;
use std::sync::mpsc;

use super::{BookMetadata, CloudClient, Credentials, UploadProgress};
use crate::catalog::Book;
use crate::error::{BookFailure, ClientError, SessionError, UploadStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    LoggedIn,
    Registered,
}

/// A book that made it to the cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBook {
    pub uuid: String,
    pub title: String,
    pub remote_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub succeeded: Vec<UploadedBook>,
    pub failures: Vec<BookFailure>,
}

impl UploadReport {
    pub fn record(&mut self, result: Result<UploadedBook, BookFailure>) {
        match result {
            Ok(uploaded) => self.succeeded.push(uploaded),
            Err(failure) => self.failures.push(failure),
        }
    }
}

pub struct CloudSession<C: CloudClient> {
    client: C,
    credentials: Credentials,
    state: SessionState,
}

impl<C: CloudClient> CloudSession<C> {
    pub fn new(client: C, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn server_name(&self) -> &str {
        &self.credentials.server_name
    }

    /// Log in and register the device.
    ///
    /// On failure nothing stays open: a registration failure logs out again
    /// before returning.
    pub fn open(&mut self) -> Result<SessionBracket<'_, C>, SessionError> {
        self.client
            .login(&self.credentials.username, &self.credentials.password)
            .map_err(|e| {
                tracing::error!(error = %e, server = %self.credentials.server_name, "Login failed");
                SessionError::Login(e)
            })?;
        self.state = SessionState::LoggedIn;

        if let Err(e) = self.client.register_device() {
            tracing::error!(error = %e, "Device registration failed");
            if let Err(logout_err) = self.client.logout() {
                tracing::warn!(error = %logout_err, "Logout after failed registration failed");
            }
            self.state = SessionState::Idle;
            return Err(SessionError::Registration(e));
        }
        self.state = SessionState::Registered;
        tracing::debug!(server = %self.credentials.server_name, "Session opened");

        Ok(SessionBracket { session: self })
    }

    /// Books already on the cloud, as uuid → remote id.
    pub fn uploaded_books(&mut self) -> Result<HashMap<String, String>, SessionError> {
        let mut bracket = self.open()?;
        bracket.list_registered_items()
    }

    /// Upload each book: file, collections, cover, metadata.
    pub fn upload_books(
        &mut self,
        books: &[Book],
        progress: Option<&mpsc::Sender<UploadProgress>>,
    ) -> Result<UploadReport, SessionError> {
        let mut bracket = self.open()?;
        Ok(bracket.upload_books(books, progress))
    }

    /// Refresh collections, cover and metadata of one book already on the cloud.
    pub fn upload_metadata_for_existing(
        &mut self,
        book: &Book,
        remote_id: &str,
    ) -> Result<UploadReport, SessionError> {
        let mut bracket = self.open()?;
        let mut report = UploadReport::default();
        report.record(bracket.refresh_book(book, remote_id));
        Ok(report)
    }

    /// Refresh several books already on the cloud inside one session.
    pub fn refresh_books(
        &mut self,
        books: &[(Book, String)],
        progress: Option<&mpsc::Sender<UploadProgress>>,
    ) -> Result<UploadReport, SessionError> {
        let mut bracket = self.open()?;
        Ok(bracket.refresh_books(books, progress))
    }
}

/// An open, registered session. Closed on drop.
pub struct SessionBracket<'a, C: CloudClient> {
    session: &'a mut CloudSession<C>,
}

impl<C: CloudClient> SessionBracket<'_, C> {
    fn client(&mut self) -> &mut C {
        &mut self.session.client
    }

    pub fn list_registered_items(&mut self) -> Result<HashMap<String, String>, SessionError> {
        let items = self
            .client()
            .list_registered_items()
            .map_err(SessionError::Listing)?;
        tracing::info!(count = items.len(), "Listed uploaded books");
        Ok(items)
    }

    pub fn upload_book(&mut self, book: &Book) -> Result<UploadedBook, BookFailure> {
        let path = match &book.file_path {
            Some(path) if path.is_file() => path,
            Some(path) => {
                let reason = format!("file not found at {}", path.display());
                return Err(failure(book, UploadStep::File, reason));
            }
            None => {
                let reason = "no file in an accepted format".to_string();
                return Err(failure(book, UploadStep::File, reason));
            }
        };

        tracing::info!(book = %book.title, "Uploading");
        let remote_id = self
            .client()
            .upload_file(path)
            .map_err(|e| client_failure(book, UploadStep::File, e))?;
        self.describe(book, &remote_id)?;

        Ok(uploaded(book, remote_id))
    }

    /// Same as [`upload_book`](Self::upload_book) without the file upload.
    pub fn refresh_book(&mut self, book: &Book, remote_id: &str) -> Result<UploadedBook, BookFailure> {
        tracing::info!(book = %book.title, remote_id, "Uploading metadata");
        self.describe(book, remote_id)?;
        Ok(uploaded(book, remote_id.to_string()))
    }

    pub fn upload_books(
        &mut self,
        books: &[Book],
        progress: Option<&mpsc::Sender<UploadProgress>>,
    ) -> UploadReport {
        self.batch(books, |b| b, progress, |bracket, book| bracket.upload_book(book))
    }

    pub fn refresh_books(
        &mut self,
        books: &[(Book, String)],
        progress: Option<&mpsc::Sender<UploadProgress>>,
    ) -> UploadReport {
        self.batch(
            books,
            |(book, _)| book,
            progress,
            |bracket, (book, remote_id)| bracket.refresh_book(book, remote_id),
        )
    }

    fn batch<T>(
        &mut self,
        items: &[T],
        book_of: impl Fn(&T) -> &Book,
        progress: Option<&mpsc::Sender<UploadProgress>>,
        mut op: impl FnMut(&mut Self, &T) -> Result<UploadedBook, BookFailure>,
    ) -> UploadReport {
        let total = items.len();
        if let Some(tx) = progress {
            let _ = tx.send(UploadProgress::Started { total });
        }

        let mut report = UploadReport::default();
        for (index, item) in items.iter().enumerate() {
            let book = book_of(item);
            if let Some(tx) = progress {
                let _ = tx.send(UploadProgress::Uploading {
                    current: index + 1,
                    total,
                    title: book.title.clone(),
                });
            }

            match op(&mut *self, item) {
                Ok(uploaded) => report.succeeded.push(uploaded),
                Err(failure) => {
                    tracing::warn!(error = %failure, "Book failed");
                    if let Some(tx) = progress {
                        let _ = tx.send(UploadProgress::Failed {
                            title: failure.title.clone(),
                            error: failure.to_string(),
                        });
                    }
                    report.failures.push(failure);
                }
            }
        }

        if let Some(tx) = progress {
            let _ = tx.send(UploadProgress::Completed {
                succeeded: report.succeeded.len(),
                failed: report.failures.len(),
            });
        }
        report
    }

    /// Collections, cover and metadata of a book already uploaded.
    fn describe(&mut self, book: &Book, remote_id: &str) -> Result<(), BookFailure> {
        for label in book.collections() {
            self.client()
                .add_to_collection(remote_id, label)
                .map_err(|e| client_failure(book, UploadStep::Collection, e))?;
        }

        if book.has_cover {
            self.client()
                .upload_cover(remote_id, &book.cover_path)
                .map_err(|e| client_failure(book, UploadStep::Cover, e))?;
        }

        let metadata = BookMetadata::from_book(book);
        self.client()
            .upload_metadata(remote_id, &metadata)
            .map_err(|e| client_failure(book, UploadStep::Metadata, e))
    }
}

impl<C: CloudClient> Drop for SessionBracket<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.session.client.unregister_device() {
            tracing::warn!(error = %e, "Device unregistration failed");
        }
        if let Err(e) = self.session.client.logout() {
            tracing::warn!(error = %e, "Logout failed");
        }
        self.session.state = SessionState::Idle;
        tracing::debug!("Session closed");
    }
}

fn uploaded(book: &Book, remote_id: String) -> UploadedBook {
    UploadedBook {
        uuid: book.uuid.clone(),
        title: book.title.clone(),
        remote_id,
    }
}

fn failure(book: &Book, step: UploadStep, reason: String) -> BookFailure {
    BookFailure {
        uuid: book.uuid.clone(),
        title: book.title.clone(),
        step,
        reason,
    }
}

fn client_failure(book: &Book, step: UploadStep, error: ClientError) -> BookFailure {
    failure(book, step, error.to_string())
}
