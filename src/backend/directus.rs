//! HTTP client for the Directus REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use super::{BackendConnector, BackendError, BackendRequest, BackendSession, Identity, Schema};
use crate::config::RequestConfig;

/// Builds [`DirectusSession`]s, one per MCP request.
#[derive(Debug, Clone, Default)]
pub struct DirectusConnector;

impl BackendConnector for DirectusConnector {
    fn connect(&self, config: &RequestConfig) -> Result<Arc<dyn BackendSession>, BackendError> {
        let session = DirectusSession::new(
            &config.backend_url,
            config.credential.clone(),
            config.timeout_sec,
        )?;
        Ok(Arc::new(session))
    }
}

/// A Directus client bound to one base URL and one credential.
pub struct DirectusSession {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl DirectusSession {
    /// Create a new session. Performs no network I/O.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout_sec: u64,
    ) -> Result<Self, BackendError> {
        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let parsed = Url::parse(&base_url).map_err(|e| BackendError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl {
                url: base_url,
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    async fn send(&self, request: &BackendRequest) -> Result<(StatusCode, Value), BackendError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Unreachable(format!("Request to {} timed out", url))
            } else {
                BackendError::Unreachable(format!("Failed to connect to {}: {}", url, e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            // Some endpoints (e.g. /server/ping) answer with plain text
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok((status, body))
    }
}

/// Extracts the first message of a `{ "errors": [{ "message": ... }] }` body.
fn error_message(status: StatusCode, body: &Value) -> String {
    body.get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| body.as_str().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl BackendSession for DirectusSession {
    async fn authenticate(&self) -> Result<Identity, BackendError> {
        let request = match self.token {
            Some(_) => BackendRequest::get("/users/me").query("fields", "id,email,first_name,last_name,role"),
            None => BackendRequest::get("/server/ping"),
        };

        let (status, body) = self.send(&request).await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Authentication(error_message(status, &body)));
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        match self.token {
            Some(_) => Ok(Identity::User(unwrap_data(body))),
            None => Ok(Identity::Anonymous),
        }
    }

    async fn fetch_schema(&self) -> Result<Schema, BackendError> {
        let (status, body) = self.send(&BackendRequest::get("/fields")).await?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        Schema::from_value(unwrap_data(body)).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn request(&self, request: BackendRequest) -> Result<Value, BackendError> {
        let (status, body) = self.send(&request).await?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        Ok(unwrap_data(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::HeaderMap,
        routing::{get, patch},
        Json, Router,
    };
    use serde_json::json;
    use tokio::net::TcpListener;

    const GOOD_TOKEN: &str = "good-token";

    fn is_authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", GOOD_TOKEN))
            .unwrap_or(false)
    }

    fn unauthorized() -> (axum::http::StatusCode, Json<Value>) {
        (
            axum::http::StatusCode::UNAUTHORIZED,
            Json(json!({"errors": [{"message": "Invalid user credentials."}]})),
        )
    }

    async fn spawn_stub_backend() -> String {
        let app = Router::new()
            .route("/server/ping", get(|| async { "pong" }))
            .route(
                "/users/me",
                get(|headers: HeaderMap| async move {
                    if is_authorized(&headers) {
                        (
                            axum::http::StatusCode::OK,
                            Json(json!({"data": {"id": "user-1", "email": "a@example.com"}})),
                        )
                    } else {
                        unauthorized()
                    }
                }),
            )
            .route(
                "/fields",
                get(|| async {
                    Json(json!({"data": [
                        {"collection": "articles", "field": "title", "type": "string", "meta": null}
                    ]}))
                }),
            )
            .route(
                "/items/articles/1",
                patch(|Json(body): Json<Value>| async move {
                    Json(json!({"data": {"id": 1, "title": body["title"]}}))
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_trailing_slash_removal() {
        let session = DirectusSession::new("http://localhost:8055/", None, 5).unwrap();
        assert_eq!(session.base_url, "http://localhost:8055");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = DirectusSession::new("not a url", None, 5);
        assert!(matches!(result, Err(BackendError::InvalidUrl { .. })));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = json!({"errors": [{"message": "Forbidden."}]});
        assert_eq!(error_message(StatusCode::FORBIDDEN, &body), "Forbidden.");
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, &Value::Null),
            "Not Found"
        );
    }

    #[tokio::test]
    async fn test_authenticate_with_valid_token() {
        let base_url = spawn_stub_backend().await;
        let session = DirectusSession::new(&base_url, Some(GOOD_TOKEN.to_string()), 5).unwrap();

        let identity = session.authenticate().await.unwrap();
        assert_eq!(identity.user_id(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_authenticate_with_invalid_token() {
        let base_url = spawn_stub_backend().await;
        let session = DirectusSession::new(&base_url, Some("bad".to_string()), 5).unwrap();

        match session.authenticate().await {
            Err(BackendError::Authentication(msg)) => {
                assert_eq!(msg, "Invalid user credentials.")
            }
            other => panic!("expected authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticate_anonymous_pings() {
        let base_url = spawn_stub_backend().await;
        let session = DirectusSession::new(&base_url, None, 5).unwrap();
        assert_eq!(session.authenticate().await.unwrap(), Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let session =
            DirectusSession::new(&format!("http://{}", addr), Some(GOOD_TOKEN.to_string()), 5)
                .unwrap();
        assert!(matches!(
            session.authenticate().await,
            Err(BackendError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_schema() {
        let base_url = spawn_stub_backend().await;
        let session = DirectusSession::new(&base_url, Some(GOOD_TOKEN.to_string()), 5).unwrap();

        let schema = session.fetch_schema().await.unwrap();
        assert!(schema.has_collection("articles"));
    }

    #[tokio::test]
    async fn test_request_unwraps_data_and_reports_status() {
        let base_url = spawn_stub_backend().await;
        let session = DirectusSession::new(&base_url, Some(GOOD_TOKEN.to_string()), 5).unwrap();

        let updated = session
            .request(BackendRequest::patch("/items/articles/1").json(json!({"title": "New"})))
            .await
            .unwrap();
        assert_eq!(updated, json!({"id": 1, "title": "New"}));

        let missing = session
            .request(BackendRequest::get("/items/unknown"))
            .await;
        assert!(matches!(
            missing,
            Err(BackendError::Status { status: 404, .. })
        ));
    }
}
