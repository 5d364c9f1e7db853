//! Memo storage - one contract, two interchangeable backends.
//!
//! - [`FileStore`]: a single JSON file written with lock + atomic rename
//! - [`RelationalStore`]: a SQLite `memos` table

pub mod file;
pub mod lock;
pub mod sqlite;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use file::FileStore;
pub use sqlite::{RelationalConfig, RelationalStore};

/// Memo identifier, assigned by the store.
pub type MemoId = i64;

/// Maximum title length in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// A stored memo.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Memo {
    pub id: MemoId,
    pub title: String,
    pub content: String,
}

/// Input for insert and update. A `None` title is rejected by validation.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoDraft {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl MemoDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
        }
    }

    /// Check the title and return `(title, content)` ready to persist.
    pub fn validate(&self) -> Result<(&str, &str)> {
        let title = match self.title.as_deref() {
            None => return Err(Error::Validation("title is missing".to_string())),
            Some("") => return Err(Error::Validation("title is empty".to_string())),
            Some(t) => t,
        };

        // SQLite's length() stops at the first NUL.
        if title.contains('\0') {
            return Err(Error::Validation("title contains a NUL character".to_string()));
        }

        let len = title.chars().count();
        if len > TITLE_MAX_CHARS {
            return Err(Error::Validation(format!(
                "title is {} characters, limit is {}",
                len, TITLE_MAX_CHARS
            )));
        }

        Ok((title, self.content.as_deref().unwrap_or("")))
    }
}

/// Id and title pair for listings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MemoTitle {
    pub id: MemoId,
    pub title: String,
}

/// Storage contract shared by every backend.
///
/// Reads report absence as `None` and only fail on backend faults.
/// `insert` and `update` never return an error: rejected input and backend
/// faults both come back as `None`, and only the logs tell them apart.
pub trait MemoStore: Send + Sync {
    /// Backend name, for logs.
    fn backend(&self) -> &'static str;

    fn find(&self, id: MemoId) -> Result<Option<Memo>>;

    fn exists(&self, id: MemoId) -> Result<bool> {
        Ok(self.find(id)?.is_some())
    }

    fn insert(&self, draft: &MemoDraft) -> Option<Memo>;

    fn update(&self, id: MemoId, draft: &MemoDraft) -> Option<Memo>;

    /// Remove a memo. Succeeds whether or not the id exists.
    fn delete(&self, id: MemoId) -> Result<MemoId>;

    /// All ids, ascending.
    fn ids(&self) -> Result<Vec<MemoId>>;

    /// All ids with their titles, ascending by id.
    fn ids_with_title(&self) -> Result<Vec<MemoTitle>>;
}

/// Collapse a write result into the failure signal, logging why it failed.
pub(crate) fn settle(backend: &str, op: &str, result: Result<Memo>) -> Option<Memo> {
    match result {
        Ok(memo) => {
            tracing::info!(backend, id = memo.id, title = %memo.title, "memo {}", op);
            Some(memo)
        }
        Err(e) if e.is_rejection() => {
            tracing::warn!(backend, "memo not {}: {}", op, e);
            None
        }
        Err(e) => {
            tracing::error!(backend, "memo not {}: {}", op, e);
            None
        }
    }
}

/// Log the outcome of a lookup.
pub(crate) fn log_lookup(backend: &str, id: MemoId, found: bool) {
    if found {
        tracing::info!(backend, "memo_id: {} is found.", id);
    } else {
        tracing::info!(backend, "memo_id: {} is not found.", id);
    }
}
