use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cloud::Credentials;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub cloud: CloudConfig,

    /// Where this config was loaded from; `save` writes back here.
    #[serde(skip)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Accepted book formats, most preferred first.
    #[serde(default = "default_accepted_formats")]
    pub accepted_formats: Vec<String>,

    /// Display name of the calibre custom column holding the read status.
    #[serde(default = "default_status_column")]
    pub status_column: String,

    /// Explicit location of calibre's `global.py.json`.
    #[serde(default)]
    pub calibre_config: Option<PathBuf>,

    /// Explicit library folder, bypassing the calibre config lookup.
    #[serde(default)]
    pub library_path: Option<PathBuf>,
}

fn default_accepted_formats() -> Vec<String> {
    vec!["EPUB".to_string()]
}

fn default_status_column() -> String {
    "statut".to_string()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            accepted_formats: default_accepted_formats(),
            status_column: default_status_column(),
            calibre_config: None,
            library_path: None,
        }
    }
}

/// Stored credentials for the e-reader cloud.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CloudConfig {
    #[serde(default)]
    pub server_name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        } else {
            // Create default config
            let mut config = Config::default();
            config.path = Some(path.to_path_buf());
            config.save()?;
            config
        };
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = self.path.clone().unwrap_or_else(Self::config_path);

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config {}", config_path.display()))?;

        Ok(())
    }

    /// Credentials for the cloud, if all of them are stored.
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            server_name: self.cloud.server_name.clone()?,
            username: self.cloud.username.clone()?,
            password: self.cloud.password.clone()?,
        })
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.cloud.server_name = Some(credentials.server_name);
        self.cloud.username = Some(credentials.username);
        self.cloud.password = Some(credentials.password);
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calibrolino")
    }

    fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CALIBROLINO_CONFIG") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.library.accepted_formats, vec!["EPUB".to_string()]);
        assert_eq!(config.library.status_column, "statut");
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[library]\nstatus_column = \"read\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.library.status_column, "read");
        assert_eq!(config.library.accepted_formats, vec!["EPUB".to_string()]);
    }

    #[test]
    fn test_credentials_require_all_fields() {
        let mut config = Config::default();
        config.cloud.server_name = Some("partner".to_string());
        config.cloud.username = Some("me".to_string());
        assert!(config.credentials().is_none());

        config.cloud.password = Some("secret".to_string());
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.username, "me");
    }

    #[test]
    fn test_saved_credentials_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load_from(&path).unwrap();
        config.set_credentials(Credentials {
            server_name: "partner".to_string(),
            username: "me".to_string(),
            password: "secret".to_string(),
        });
        config.save().unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.credentials().unwrap().server_name, "partner");
    }
}
