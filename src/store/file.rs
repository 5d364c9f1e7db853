//! File-backed memo store.
//!
//! The whole table lives in one JSON file. Readers load a snapshot without
//! locking; writers hold the lock file, then replace the store file by
//! writing a temporary sibling and renaming it into place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::lock::with_lock;
use super::{log_lookup, settle, Memo, MemoDraft, MemoId, MemoStore, MemoTitle};

/// Stored body of one memo.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MemoBody {
    pub title: String,
    pub content: String,
}

/// On-disk file format.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MemoTable {
    /// Highest id ever assigned; survives deletion of that memo.
    #[serde(default)]
    pub last_id: MemoId,
    #[serde(default)]
    pub memos: BTreeMap<MemoId, MemoBody>,
}

impl MemoTable {
    pub fn next_id(&self) -> MemoId {
        let max_existing = self.memos.keys().next_back().copied().unwrap_or(0);
        max_existing.max(self.last_id) + 1
    }

    fn memo(&self, id: MemoId) -> Option<Memo> {
        self.memos.get(&id).map(|body| Memo {
            id,
            title: body.title.clone(),
            content: body.content.clone(),
        })
    }
}

/// Memo store over a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Id the next successful insert will get.
    pub fn next_id(&self) -> Result<MemoId> {
        Ok(self.read()?.next_id())
    }

    /// Read-only transaction: a snapshot of the committed table.
    fn read(&self) -> Result<MemoTable> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(MemoTable::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write transaction. The table is saved only if `f` returns `Ok`.
    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut MemoTable) -> Result<T>,
    {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        with_lock(&self.path, || {
            let mut table = self.read()?;
            let value = f(&mut table)?;
            self.commit(&table)?;
            Ok(value)
        })
    }

    fn commit(&self, table: &MemoTable) -> Result<()> {
        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let content = serde_json::to_string_pretty(table)?;
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;

        // The rename has landed, so the write counts as committed.
        if let Err(e) = sync_parent(&self.path) {
            tracing::warn!("Failed to sync directory of {}: {}", self.path.display(), e);
        }
        Ok(())
    }

    fn try_insert(&self, draft: &MemoDraft) -> Result<Memo> {
        let (title, content) = draft.validate()?;

        self.write(|table| {
            let id = table.next_id();
            if table.memos.contains_key(&id) {
                return Err(Error::Storage(format!("memo_id: {} already exists", id)));
            }
            table.memos.insert(
                id,
                MemoBody {
                    title: title.to_string(),
                    content: content.to_string(),
                },
            );
            table.last_id = id;
            Ok(Memo {
                id,
                title: title.to_string(),
                content: content.to_string(),
            })
        })
    }

    fn try_update(&self, id: MemoId, draft: &MemoDraft) -> Result<Memo> {
        let (title, content) = draft.validate()?;

        self.write(|table| {
            let body = table
                .memos
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("memo_id: {}", id)))?;
            body.title = title.to_string();
            body.content = content.to_string();
            Ok(Memo {
                id,
                title: title.to_string(),
                content: content.to_string(),
            })
        })
    }
}

/// Flush the rename itself to disk.
#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

impl MemoStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn find(&self, id: MemoId) -> Result<Option<Memo>> {
        let memo = self.read()?.memo(id);
        log_lookup(self.backend(), id, memo.is_some());
        Ok(memo)
    }

    fn insert(&self, draft: &MemoDraft) -> Option<Memo> {
        settle(self.backend(), "inserted", self.try_insert(draft))
    }

    fn update(&self, id: MemoId, draft: &MemoDraft) -> Option<Memo> {
        settle(self.backend(), "updated", self.try_update(id, draft))
    }

    fn delete(&self, id: MemoId) -> Result<MemoId> {
        self.write(|table| {
            table.memos.remove(&id);
            Ok(())
        })?;
        tracing::info!(backend = self.backend(), "memo_id: {} is deleted.", id);
        Ok(id)
    }

    fn ids(&self) -> Result<Vec<MemoId>> {
        Ok(self.read()?.memos.keys().copied().collect())
    }

    fn ids_with_title(&self) -> Result<Vec<MemoTitle>> {
        Ok(self
            .read()?
            .memos
            .into_iter()
            .map(|(id, body)| MemoTitle { id, title: body.title })
            .collect())
    }
}
