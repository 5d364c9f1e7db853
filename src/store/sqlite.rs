//! SQLite-backed memo store.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Error, Result};

use super::{log_lookup, settle, Memo, MemoDraft, MemoId, MemoStore, MemoTitle};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS memos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 100),
        content TEXT NOT NULL DEFAULT ''
    );
"#;

const SELECT_MEMO: &str = "SELECT id, title, content FROM memos WHERE id = ?1";
const INSERT_MEMO: &str = "INSERT INTO memos (title, content) VALUES (?1, ?2)";
const UPDATE_MEMO: &str = "UPDATE memos SET title = ?1, content = ?2 WHERE id = ?3";
const DELETE_MEMO: &str = "DELETE FROM memos WHERE id = ?1";
const SELECT_IDS: &str = "SELECT id FROM memos ORDER BY id";
const SELECT_TITLES: &str = "SELECT id, title FROM memos ORDER BY id";

/// How long a statement waits on another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the database lives. `None` opens a private in-memory database.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RelationalConfig {
    pub database: Option<PathBuf>,
}

/// Memo store over a SQLite `memos` table.
pub struct RelationalStore {
    conn: Mutex<Connection>,
}

impl RelationalStore {
    /// Connect and create the table if it is missing.
    pub fn open(config: &RelationalConfig) -> Result<Self> {
        let conn = match &config.database {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Connection::open(path)
            }
            None => Connection::open_in_memory(),
        }
        .map_err(|e| Error::Storage(format!("sqlite open: {}", e)))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| Error::Storage(format!("sqlite busy timeout: {}", e)))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::Storage(format!("sqlite init: {}", e)))?;

        tracing::debug!("Opened memo database: {:?}", config.database);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("sqlite connection lock poisoned".to_string()))
    }

    fn try_insert(&self, draft: &MemoDraft) -> Result<Memo> {
        let (title, content) = draft.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.prepare_cached(INSERT_MEMO)?
            .execute(params![title, content])?;
        // Same connection and transaction, so no other writer's row can answer.
        let id = tx.last_insert_rowid();
        let memo = tx
            .prepare_cached(SELECT_MEMO)?
            .query_row(params![id], memo_from_row)?;
        tx.commit()?;
        Ok(memo)
    }

    fn try_update(&self, id: MemoId, draft: &MemoDraft) -> Result<Memo> {
        if self.find(id)?.is_none() {
            return Err(Error::NotFound(format!("memo_id: {}", id)));
        }
        let (title, content) = draft.validate()?;

        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            tx.prepare_cached(UPDATE_MEMO)?
                .execute(params![title, content, id])?;
            tx.commit()?;
        }

        self.find(id)?
            .ok_or_else(|| Error::Storage(format!("memo_id: {} vanished after update", id)))
    }
}

fn memo_from_row(row: &Row<'_>) -> rusqlite::Result<Memo> {
    Ok(Memo {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
    })
}

impl MemoStore for RelationalStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn find(&self, id: MemoId) -> Result<Option<Memo>> {
        let conn = self.conn()?;
        let memo = conn
            .prepare_cached(SELECT_MEMO)?
            .query_row(params![id], memo_from_row)
            .optional()?;
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
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.prepare_cached(DELETE_MEMO)?.execute(params![id])?;
        tx.commit()?;
        tracing::info!(backend = self.backend(), "memo_id: {} is deleted.", id);
        Ok(id)
    }

    fn ids(&self) -> Result<Vec<MemoId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SELECT_IDS)?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<MemoId>>>()?;
        Ok(ids)
    }

    fn ids_with_title(&self) -> Result<Vec<MemoTitle>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SELECT_TITLES)?;
        let titles = stmt
            .query_map([], |row| {
                Ok(MemoTitle {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(titles)
    }
}
