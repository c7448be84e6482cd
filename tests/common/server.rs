//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated MCP server wired to its own fake backend.

use super::backend::FakeBackend;
use super::constants::*;
use directus_mcp_server::server::RequestsLoggingLevel;
use directus_mcp_server::{make_app, AppConfig, DirectusConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Test server instance with its own fake backend
///
/// When dropped, both the MCP server and the fake backend shut down.
pub struct TestServer {
    /// Base URL of the MCP surface, including the base path if any
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// URL of the health endpoint
    pub health_url: String,

    /// Base URL of the fake backend, for direct requests in tests
    pub backend_url: String,

    // Private fields - keep resources alive until drop
    _backend: FakeBackend,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with the default config
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns a new test server, letting the caller adjust the config first
    ///
    /// The backend URL is always pointed at the fake backend after
    /// `customize` runs.
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready
    /// within timeout.
    pub async fn spawn_with<F>(customize: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let backend = FakeBackend::spawn().await;

        let mut config = AppConfig {
            logging_level: RequestsLoggingLevel::None,
            backend_timeout_sec: REQUEST_TIMEOUT_SECS,
            ..AppConfig::default()
        };
        customize(&mut config);
        config.backend_url = backend.base_url.clone();
        let base_path = config.base_path.clone();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}{}", port, base_path);
        // A nested root answers without the trailing slash
        let health_url = if base_path.is_empty() {
            format!("{}/", base_url)
        } else {
            base_url.clone()
        };

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let app = make_app(config, Arc::new(DirectusConnector));

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            health_url,
            backend_url: backend.base_url.clone(),
            _backend: backend,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the health endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(&self.health_url).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
