use anyhow::{Context, Result};
use std::sync::Arc;

use tracing::{debug, error, info, Instrument};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{log_requests, metrics::metrics_handler, state::*};
use crate::backend::BackendConnector;
use crate::config::{AppConfig, RequestConfig, RequestInputs};
use crate::mcp::transport::error_response;
use crate::mcp::{bootstrap_error_response, McpBundle, McpError};

pub const SERVER_STATUS: &str = "MCP Server is running";
pub const CAPABILITIES: [&str; 2] = ["tools", "prompts"];

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    capabilities: Vec<&'static str>,
}

#[derive(Serialize)]
struct HealthFailure {
    error: &'static str,
    details: String,
}

#[derive(Deserialize, Debug, Default)]
struct McpQuery {
    access_token: Option<String>,
}

async fn home() -> Response {
    let health = HealthResponse {
        status: SERVER_STATUS,
        version: env!("CARGO_PKG_VERSION"),
        capabilities: CAPABILITIES.to_vec(),
    };
    match serde_json::to_value(&health) {
        Ok(body) => Json(body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthFailure {
                error: "MCP Server initialization failed",
                details: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// One MCP exchange: a fresh bundle is built for the caller, serves the
/// body and is torn down when it goes out of scope (also when the client
/// disconnects and this future is dropped).
async fn post_mcp(
    State(state): State<ServerState>,
    Query(query): Query<McpQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let inputs = RequestInputs::from_parts(query.access_token, &headers);
    let config = RequestConfig::resolve(inputs, &state.config);
    let span = tracing::info_span!("mcp", request_id = %uuid::Uuid::new_v4());

    async move {
        let mut bundle = match McpBundle::bootstrap(config, state.connector.as_ref()).await {
            Ok(bundle) => bundle,
            Err(e) => {
                error!("Error handling MCP request: {}", e);
                return bootstrap_error_response();
            }
        };

        debug!(
            "Serving MCP request for {}",
            bundle.identity().user_id().unwrap_or("anonymous")
        );
        bundle.serve(&headers, &body).await
    }
    .instrument(span)
    .await
}

async fn mcp_method_not_allowed() -> Response {
    info!("Rejected non-POST MCP request");
    error_response(StatusCode::METHOD_NOT_ALLOWED, McpError::MethodNotAllowed)
}

pub fn make_app(config: AppConfig, connector: Arc<dyn BackendConnector>) -> Router {
    let base_path = config.base_path.clone();
    let state = ServerState::new(config, connector);

    let routes: Router = Router::new()
        .route("/", get(home))
        .route(
            "/mcp",
            get(mcp_method_not_allowed)
                .post(post_mcp)
                .delete(mcp_method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state);

    if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(&base_path, routes)
    }
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

pub async fn run_server(config: AppConfig, connector: Arc<dyn BackendConnector>) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, connector);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    let main_server = async {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("MCP server failed")
    };
    let metrics_server = async {
        axum::serve(metrics_listener, make_metrics_app())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Metrics server failed")
    };

    tokio::try_join!(main_server, metrics_server)?;
    Ok(())
}
