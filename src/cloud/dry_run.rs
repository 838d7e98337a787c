//! A [`CloudClient`] that only logs what it would do.
//!
//! Nothing leaves the machine, so the cloud always looks empty and every run
//! plans a full upload.

use std::collections::HashMap;
use std::path::Path;

use super::{BookMetadata, CloudClient};
use crate::error::ClientError;

#[derive(Debug, Default)]
pub struct DryRunClient {
    server_name: String,
    logged_in: bool,
    registered: bool,
    /// File path → remote id handed out for it.
    files: HashMap<String, String>,
}

impl DryRunClient {
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_string(),
            ..Default::default()
        }
    }

    fn ensure_registered(&self) -> Result<(), ClientError> {
        if self.logged_in && self.registered {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}

impl CloudClient for DryRunClient {
    fn login(&mut self, username: &str, _password: &str) -> Result<(), ClientError> {
        tracing::info!(server = %self.server_name, username, "[dry-run] login");
        self.logged_in = true;
        Ok(())
    }

    fn register_device(&mut self) -> Result<(), ClientError> {
        if !self.logged_in {
            return Err(ClientError::NotConnected);
        }
        tracing::info!("[dry-run] register device");
        self.registered = true;
        Ok(())
    }

    fn unregister_device(&mut self) -> Result<(), ClientError> {
        tracing::info!("[dry-run] unregister device");
        self.registered = false;
        Ok(())
    }

    fn logout(&mut self) -> Result<(), ClientError> {
        tracing::info!("[dry-run] logout");
        self.logged_in = false;
        Ok(())
    }

    fn upload_file(&mut self, path: &Path) -> Result<String, ClientError> {
        self.ensure_registered()?;
        if !path.is_file() {
            return Err(ClientError::Io(format!("{} is not a file", path.display())));
        }
        let next_id = format!("dry-run-{}", self.files.len() + 1);
        let remote_id = self
            .files
            .entry(path.to_string_lossy().to_string())
            .or_insert(next_id)
            .clone();
        tracing::info!(path = %path.display(), remote_id = %remote_id, "[dry-run] upload file");
        Ok(remote_id)
    }

    fn add_to_collection(&mut self, remote_id: &str, label: &str) -> Result<(), ClientError> {
        self.ensure_registered()?;
        tracing::info!(remote_id, label, "[dry-run] add to collection");
        Ok(())
    }

    fn upload_cover(&mut self, remote_id: &str, path: &Path) -> Result<(), ClientError> {
        self.ensure_registered()?;
        tracing::info!(remote_id, path = %path.display(), "[dry-run] upload cover");
        Ok(())
    }

    fn upload_metadata(&mut self, remote_id: &str, fields: &BookMetadata) -> Result<(), ClientError> {
        self.ensure_registered()?;
        tracing::info!(
            remote_id,
            title = %fields.title,
            author = %fields.author,
            "[dry-run] upload metadata"
        );
        Ok(())
    }

    fn list_registered_items(&mut self) -> Result<HashMap<String, String>, ClientError> {
        self.ensure_registered()?;
        Ok(HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_calls_need_a_registered_session() {
        let mut client = DryRunClient::new("partner");
        assert_eq!(client.list_registered_items(), Err(ClientError::NotConnected));
        assert_eq!(client.register_device(), Err(ClientError::NotConnected));

        client.login("me", "secret").unwrap();
        client.register_device().unwrap();
        assert!(client.list_registered_items().unwrap().is_empty());

        client.unregister_device().unwrap();
        assert_eq!(
            client.add_to_collection("dry-run-1", "sf"),
            Err(ClientError::NotConnected)
        );
    }

    #[test]
    fn test_same_file_gets_same_id() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("book.epub");
        std::fs::write(&file, b"book").unwrap();

        let mut client = DryRunClient::new("partner");
        client.login("me", "secret").unwrap();
        client.register_device().unwrap();

        let first = client.upload_file(&file).unwrap();
        let second = client.upload_file(&file).unwrap();
        assert_eq!(first, second);
        assert!(client.upload_file(&dir.path().join("missing.epub")).is_err());
    }
}
