//! Finds the calibre library on disk through calibre's own config file.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::LocateError;

const CALIBRE_FOLDER: &str = "calibre";
const CALIBRE_CONFIG_FILE: &str = "global.py.json";
const LIBRARY_PATH_KEY: &str = "library_path";
pub const DATABASE_FILE: &str = "metadata.db";

/// A calibre library folder and its metadata database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLocation {
    pub root: PathBuf,
    pub database: PathBuf,
}

impl LibraryLocation {
    /// Use `root` as the library folder. Fails if it holds no database.
    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self, LocateError> {
        let root = root.into();
        let database = root.join(DATABASE_FILE);
        if !database.is_file() {
            return Err(LocateError::DatabaseNotFound(database));
        }
        Ok(Self { root, database })
    }
}

/// Default location of calibre's global config, under the user config home.
pub fn default_calibre_config() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CALIBRE_FOLDER)
        .join(CALIBRE_CONFIG_FILE)
}

/// Read calibre's config at `config_path` and resolve the library it points to.
pub fn locate_library(config_path: &Path) -> Result<LibraryLocation, LocateError> {
    let content =
        std::fs::read_to_string(config_path).map_err(|source| LocateError::ConfigUnreadable {
            path: config_path.to_path_buf(),
            source,
        })?;
    let config: Value =
        serde_json::from_str(&content).map_err(|source| LocateError::ConfigInvalid {
            path: config_path.to_path_buf(),
            source,
        })?;

    let root = config
        .get(LIBRARY_PATH_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| LocateError::MissingLibraryPath {
            path: config_path.to_path_buf(),
            key: LIBRARY_PATH_KEY,
        })?;

    let location = LibraryLocation::from_root(root)?;
    tracing::debug!(library = ?location.root, "Found calibre library");
    Ok(location)
}
