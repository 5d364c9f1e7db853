//! Configuration loading for memopad.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Error;
use crate::store::{FileStore, MemoStore, RelationalConfig, RelationalStore};

pub type Result<T> = std::result::Result<T, Error>;

/// File name of the file backend's store under the data directory.
pub const DEFAULT_STORE_FILE: &str = "memo_data.json";

/// File name of the SQLite database under the data directory.
pub const DEFAULT_DATABASE_FILE: &str = "memos.db";

/// Get the memopad data directory.
pub fn get_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "memopad", "memopad")
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(dirs.data_dir().to_path_buf())
}

/// Which storage backend to run on.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Sqlite,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::File => write!(f, "file"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Web server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WebSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4567
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendKind,
    /// Store file for the file backend.
    pub store_path: Option<PathBuf>,
    /// Database file for the sqlite backend.
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub web: WebSettings,
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Settings file not found at {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Resolved store file, falling back to the data directory.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_data_dir()?.join(DEFAULT_STORE_FILE)),
        }
    }

    /// Resolved database file, falling back to the data directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(get_data_dir()?.join(DEFAULT_DATABASE_FILE)),
        }
    }

    /// Build the configured backend.
    pub fn open_store(&self) -> Result<Arc<dyn MemoStore>> {
        let store: Arc<dyn MemoStore> = match self.backend {
            BackendKind::File => Arc::new(FileStore::new(self.store_path()?)),
            BackendKind::Sqlite => Arc::new(RelationalStore::open(&RelationalConfig {
                database: Some(self.database_path()?),
            })?),
        };
        tracing::info!("Using {} memo store", store.backend());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_partial_settings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"backend": "sqlite", "web": {"port": 8080}}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.backend, BackendKind::Sqlite);
        assert_eq!(settings.web.port, 8080);
        assert_eq!(settings.web.host, "127.0.0.1");
        assert!(settings.store_path.is_none());
    }

    #[test]
    fn test_missing_settings_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Settings::load(&temp_dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_open_store_selects_backend() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = Settings {
            store_path: Some(temp_dir.path().join("memo_data.json")),
            database: Some(temp_dir.path().join("memos.db")),
            ..Default::default()
        };
        assert_eq!(settings.open_store().unwrap().backend(), "file");

        settings.backend = BackendKind::Sqlite;
        assert_eq!(settings.open_store().unwrap().backend(), "sqlite");
        assert!(temp_dir.path().join("memos.db").exists());
    }
}
