//! CLI commands for memopad using clap.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{get_data_dir, BackendKind, Settings};
use crate::store::{MemoDraft, MemoId, MemoStore};
use crate::web::{run_server, WebServerConfig};

/// memopad - a small memo web app.
#[derive(Parser)]
#[command(name = "memopad")]
#[command(version)]
#[command(about = "memopad - server-rendered memos on a file or SQLite store", long_about = None)]
pub struct Commands {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Backend selection shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Settings file (JSON)
    #[arg(long, global = true, env = "MEMOPAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage backend
    #[arg(long, global = true, value_enum, env = "MEMOPAD_BACKEND")]
    pub backend: Option<BackendKind>,

    /// Store file for the file backend
    #[arg(long, global = true, env = "MEMO_APP_STORE")]
    pub store: Option<PathBuf>,

    /// Database file for the sqlite backend
    #[arg(long, global = true, env = "MEMOPAD_DATABASE")]
    pub database: Option<PathBuf>,
}

impl StoreArgs {
    /// Settings file, then flags and environment on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if let Some(store) = &self.store {
            settings.store_path = Some(store.clone());
        }
        if let Some(database) = &self.database {
            settings.database = Some(database.clone());
        }
        Ok(settings)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the web app
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List memo ids and titles
    List,

    /// Show one memo
    Show {
        id: MemoId,
    },

    /// Create a memo
    Add {
        title: String,
        #[arg(default_value = "")]
        content: String,
    },

    /// Replace a memo's title and content
    Edit {
        id: MemoId,
        title: String,
        #[arg(default_value = "")]
        content: String,
    },

    /// Delete a memo
    Delete {
        id: MemoId,
    },
}

impl Commands {
    /// Whether this invocation runs the long-lived server.
    pub fn is_server(&self) -> bool {
        matches!(self.command, Command::Serve { .. })
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.store.settings()?;
        let store = settings
            .open_store()
            .with_context(|| format!("opening {} store", settings.backend))?;

        match self.command {
            Command::Serve { host, port } => {
                let config = WebServerConfig {
                    host: host.unwrap_or(settings.web.host),
                    port: port.unwrap_or(settings.web.port),
                };
                run_server(config, store).await?;
            }
            command => run_memo_command(command, store.as_ref())?,
        }
        Ok(())
    }
}

/// Default log directory for the server.
pub fn log_dir() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("logs"))
}

fn run_memo_command(command: Command, store: &dyn MemoStore) -> Result<()> {
    match command {
        Command::List => {
            let titles = store.ids_with_title()?;
            if titles.is_empty() {
                println!("No memos.");
            }
            for memo in titles {
                println!("{:>5}  {}", memo.id, memo.title);
            }
        }
        Command::Show { id } => match store.find(id)? {
            Some(memo) => {
                println!("# {} ({})", memo.title, memo.id);
                println!();
                println!("{}", memo.content);
            }
            None => bail!("memo {} not found", id),
        },
        Command::Add { title, content } => {
            let Some(memo) = store.insert(&MemoDraft::new(title, content)) else {
                bail!("memo was not saved (title must be 1-100 characters)");
            };
            println!("Created memo {}", memo.id);
        }
        Command::Edit { id, title, content } => {
            let Some(memo) = store.update(id, &MemoDraft::new(title, content)) else {
                bail!("memo {} was not updated (missing id or invalid title)", id);
            };
            println!("Updated memo {}", memo.id);
        }
        Command::Delete { id } => {
            store.delete(id)?;
            println!("Deleted memo {}", id);
        }
        Command::Serve { .. } => bail!("serve is not a memo command"),
    }
    Ok(())
}
