//! memopad library root.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod web;

pub use cli::Commands;
pub use config::{BackendKind, Settings};
pub use error::{Error, Result};
pub use store::{FileStore, Memo, MemoDraft, MemoId, MemoStore, MemoTitle, RelationalStore};
pub use web::run_server;
