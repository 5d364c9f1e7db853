//! Error types for memopad.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Web error: {0}")]
    Web(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than the backend.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NotFound(_))
    }
}
