//! Web server using Axum.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::MemoStore;

use super::router::create_app_router;

/// Web server configuration.
pub struct WebServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            port: 4567,
            host: "127.0.0.1".to_string(),
        }
    }
}

/// Run the web server until Ctrl-C.
pub async fn run_server(config: WebServerConfig, store: Arc<dyn MemoStore>) -> Result<()> {
    let app = create_app_router(store);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| Error::Web(format!("Invalid address: {}", e)))?;

    tracing::info!("Starting web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RelationalConfig, RelationalStore};

    #[tokio::test]
    async fn test_invalid_address() {
        let store = Arc::new(RelationalStore::open(&RelationalConfig::default()).unwrap());
        let config = WebServerConfig {
            host: "not an address".to_string(),
            ..Default::default()
        };
        let err = run_server(config, store).await.unwrap_err();
        assert!(matches!(err, Error::Web(_)));
    }
}
