//! Web front end (Axum, server-rendered HTML).

pub mod memos;
pub mod pages;
pub mod router;
pub mod server;

pub use router::create_app_router;
pub use server::{run_server, WebServerConfig};
