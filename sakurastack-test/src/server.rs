//! Test server management

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use sakurastack_secretmanager::SecretManagerState;

use crate::{SecretManagerClient, DEFAULT_PREFIX, STARTUP_TIMEOUT_SECS};

/// A running Secret Manager server bound to an ephemeral local port
pub struct TestServer {
    /// Base URL, without the API prefix
    base_url: String,
    prefix: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    /// Start a server with the default API prefix
    pub async fn start() -> Result<Self, TestError> {
        Self::start_with_prefix(DEFAULT_PREFIX).await
    }

    /// Start a server mounted under `prefix`
    pub async fn start_with_prefix(prefix: &str) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| TestError::StartFailed(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| TestError::StartFailed(e.to_string()))?;

        info!(port = addr.port(), "Starting Secret Manager test server");

        let state = Arc::new(SecretManagerState::new(prefix));
        let app = sakurastack_secretmanager::router(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let server = Self {
            base_url: format!("http://{addr}"),
            prefix: prefix.to_string(),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        };
        server.wait_ready().await?;
        Ok(server)
    }

    async fn wait_ready(&self) -> Result<(), TestError> {
        let readiness = self.client("readiness-check");
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_secs(STARTUP_TIMEOUT_SECS) {
            if readiness.list().await.is_ok() {
                info!(url = %self.base_url, "Secret Manager test server ready");
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Err(TestError::StartupTimeout)
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Root URL including the API prefix, as a client would be configured
    pub fn api_root_url(&self) -> String {
        format!("{}{}", self.base_url, self.prefix)
    }

    /// Get a client bound to `vault_id`
    pub fn client(&self, vault_id: &str) -> SecretManagerClient {
        SecretManagerClient::new(self.api_root_url(), vault_id)
    }

    /// Stop the server and wait for in-flight requests to finish
    pub async fn stop(&mut self) {
        info!("Stopping Secret Manager test server");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Secret Manager test server stopped");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Errors that can occur with test server
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("Failed to start server: {0}")]
    StartFailed(String),

    #[error("Server startup timed out")]
    StartupTimeout,
}
