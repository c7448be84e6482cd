//! Per-request server bundle.
//!
//! Every POST to the MCP endpoint builds its own [`McpBundle`]: a backend
//! session for the caller's credential, the caller's schema, the tool and
//! prompt registries, a protocol server and a transport. Nothing is shared
//! between requests except the static tool template.

use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::Response,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::context::ToolContext;
use super::prompts::PromptRegistry;
use super::protocol::McpError;
use super::registry::ToolRegistry;
use super::server::{McpServer, ServerPhase};
use super::tools::TOOLS;
use super::transport::{error_response, StatelessTransport};
use crate::backend::{BackendConnector, BackendError, Identity};
use crate::config::RequestConfig;
use crate::server::metrics;

/// Message of every 500 returned when a bundle cannot be built.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to create backend session: {0}")]
    Connect(#[source] BackendError),

    #[error("Failed to authenticate with backend: {0}")]
    Authentication(#[source] BackendError),

    #[error("Failed to fetch schema: {0}")]
    Schema(#[source] BackendError),

    #[error("Failed to start MCP server: {0}")]
    Server(String),
}

impl BootstrapError {
    fn stage(&self) -> &'static str {
        match self {
            BootstrapError::Connect(_) => "connect",
            BootstrapError::Authentication(_) => "authenticate",
            BootstrapError::Schema(_) => "schema",
            BootstrapError::Server(_) => "server",
        }
    }
}

/// Response for a request whose bundle could not be built. The cause is
/// logged, never sent to the caller.
pub fn bootstrap_error_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        McpError::InternalError(INTERNAL_SERVER_ERROR_MESSAGE.to_string()),
    )
}

type TeardownHook = Box<dyn FnOnce() + Send>;

pub struct McpBundle {
    identity: Identity,
    server: Option<McpServer>,
    transport: Option<StatelessTransport>,
    on_teardown: Option<TeardownHook>,
    released: bool,
}

impl McpBundle {
    /// Authenticates, resolves the schema and assembles the registries, in
    /// that order. Any backend failure aborts the bundle.
    pub async fn bootstrap(
        config: RequestConfig,
        connector: &dyn BackendConnector,
    ) -> Result<Self, BootstrapError> {
        Self::assemble(config, connector).await.inspect_err(|e| {
            warn!("MCP bootstrap failed: {}", e);
            metrics::record_bootstrap_failure(e.stage());
        })
    }

    async fn assemble(
        config: RequestConfig,
        connector: &dyn BackendConnector,
    ) -> Result<Self, BootstrapError> {
        let session = connector
            .connect(&config)
            .map_err(BootstrapError::Connect)?;
        let identity = session
            .authenticate()
            .await
            .map_err(BootstrapError::Authentication)?;
        let schema = session
            .fetch_schema()
            .await
            .map_err(BootstrapError::Schema)?;

        let prompts = PromptRegistry::fetch(session.as_ref(), &config.prompts, &schema).await;
        let registry: &'static ToolRegistry = &TOOLS;
        let tools = registry.active(&config.tools);

        debug!(
            "MCP bundle for {} with {} tools, {} prompts, {} collections",
            identity.user_id().unwrap_or("anonymous"),
            tools.len(),
            prompts.len(),
            schema.collections.len()
        );

        let context = ToolContext {
            session,
            schema: Arc::new(schema),
            base_url: config.backend_url.clone(),
            system_prompt: config.tools.system_prompt.clone(),
        };

        let mut server = McpServer::new();
        server
            .bootstrap(context, tools, prompts)
            .map_err(|e| BootstrapError::Server(e.message()))?;

        metrics::bundle_created();
        Ok(Self {
            identity,
            server: Some(server),
            transport: Some(StatelessTransport::new()),
            on_teardown: None,
            released: false,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn server_phase(&self) -> ServerPhase {
        self.server
            .as_ref()
            .map(McpServer::phase)
            .unwrap_or(ServerPhase::Closed)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.transport.as_ref().and_then(StatelessTransport::session_id)
    }

    /// Registers a callback run once, after the bundle has been released.
    pub fn on_teardown(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.on_teardown = Some(Box::new(hook));
    }

    /// Connects the server to the transport and handles the exchange.
    pub async fn serve(&mut self, headers: &HeaderMap, body: &[u8]) -> Response {
        let (Some(server), Some(transport)) = (self.server.as_mut(), self.transport.as_ref())
        else {
            return bootstrap_error_response();
        };

        if let Err(e) = server.connect() {
            warn!("MCP server could not connect: {}", e.message());
            return bootstrap_error_response();
        }

        transport.handle_request(server, headers, body).await
    }

    /// Closes the transport, then the server. Returns true only for the
    /// call that actually released them.
    pub fn teardown(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;

        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        if let Some(mut server) = self.server.take() {
            server.close();
        }

        metrics::bundle_released();
        debug!("MCP request closed");

        if let Some(hook) = self.on_teardown.take() {
            hook();
        }
        true
    }
}

impl Drop for McpBundle {
    fn drop(&mut self) {
        self.teardown();
    }
}
