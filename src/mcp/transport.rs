//! Stateless Streamable-HTTP Transport
//!
//! Carries exactly one HTTP exchange: decodes the POSTed JSON-RPC message
//! (or batch), hands each message to the server and encodes the replies.
//! No session id is ever issued.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::debug;

use super::protocol::{McpError, McpRequest, McpResponse, RequestId, JSONRPC_VERSION};
use super::server::McpServer;

/// A decoded request body. Batch elements are decoded one by one; an
/// invalid element carries the error response it gets in the reply.
#[derive(Debug, Clone)]
pub enum Incoming {
    Single(McpRequest),
    Batch(Vec<Result<McpRequest, McpResponse>>),
}

/// Why a body was refused before reaching the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub status: StatusCode,
    pub error: McpError,
}

impl Rejection {
    fn new(status: StatusCode, error: McpError) -> Self {
        Self { status, error }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        error_response(self.status, self.error)
    }
}

/// JSON-RPC error envelope with a null id.
pub fn error_response(status: StatusCode, error: McpError) -> Response {
    (status, Json(McpResponse::error(None, error))).into_response()
}

#[derive(Debug, Default)]
pub struct StatelessTransport {
    closed: bool,
}

impl StatelessTransport {
    pub fn new() -> Self {
        Self { closed: false }
    }

    /// Always `None`: stateless mode never issues a session.
    pub fn session_id(&self) -> Option<&str> {
        None
    }

    /// Marks the transport closed. Returns false if it already was.
    pub fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }

    /// Runs one HTTP exchange against `server`.
    pub async fn handle_request(
        &self,
        server: &McpServer,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Response {
        if self.closed {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                McpError::InternalError("Transport is closed".to_string()),
            );
        }

        let incoming = match decode(headers, body) {
            Ok(incoming) => incoming,
            Err(rejection) => {
                debug!("Rejected MCP body: {}", rejection.error.message());
                return rejection.into_response();
            }
        };

        match incoming {
            Incoming::Single(request) => match server.handle(request).await {
                Some(response) => (StatusCode::OK, Json(response)).into_response(),
                None => StatusCode::ACCEPTED.into_response(),
            },
            Incoming::Batch(elements) => {
                let mut responses = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        Ok(request) => {
                            if let Some(response) = server.handle(request).await {
                                responses.push(response);
                            }
                        }
                        Err(invalid) => responses.push(invalid),
                    }
                }
                if responses.is_empty() {
                    StatusCode::ACCEPTED.into_response()
                } else {
                    (StatusCode::OK, Json(responses)).into_response()
                }
            }
        }
    }
}

/// Validates the content type and decodes the body.
pub fn decode(headers: &HeaderMap, body: &[u8]) -> Result<Incoming, Rejection> {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        let essence = content_type
            .to_str()
            .ok()
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .unwrap_or_default();
        if !essence.eq_ignore_ascii_case("application/json") {
            return Err(Rejection::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                McpError::UnsupportedMediaType(
                    "Content-Type must be application/json".to_string(),
                ),
            ));
        }
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        Rejection::new(StatusCode::BAD_REQUEST, McpError::ParseError(e.to_string()))
    })?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(invalid_request("Empty batch"));
            }
            Ok(Incoming::Batch(
                items.into_iter().map(decode_batch_element).collect(),
            ))
        }
        other => decode_message(other).map(Incoming::Single),
    }
}

fn decode_message(value: Value) -> Result<McpRequest, Rejection> {
    if !value.is_object() {
        return Err(invalid_request("Message must be an object"));
    }
    let request: McpRequest =
        serde_json::from_value(value).map_err(|e| invalid_request(&e.to_string()))?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(invalid_request("jsonrpc must be \"2.0\""));
    }
    Ok(request)
}

fn decode_batch_element(value: Value) -> Result<McpRequest, McpResponse> {
    let id = value
        .get("id")
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
    decode_message(value).map_err(|rejection| {
        debug!("Rejected batch element: {}", rejection.error.message());
        McpResponse::error(id, rejection.error)
    })
}

fn invalid_request(reason: &str) -> Rejection {
    Rejection::new(
        StatusCode::BAD_REQUEST,
        McpError::InvalidRequest(reason.to_string()),
    )
}
