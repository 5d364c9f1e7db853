//! memopad - minimal server-rendered memo app.

use clap::Parser;
use std::process::ExitCode;

use memopad::{cli, logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Commands::parse();

    // The server also logs to a rolling file; one-shot commands only to stderr
    let logging = if args.is_server() {
        cli::log_dir().and_then(|dir| logging::init_with_file(&dir).map(Some))
    } else {
        logging::init_console().map(|()| None)
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
