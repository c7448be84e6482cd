//! Backend access.
//!
//! The MCP server never talks to the content platform directly; it goes
//! through a [`BackendSession`] obtained from a [`BackendConnector`]. Each
//! MCP request gets its own session bound to the caller's credential.

pub mod directus;
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::config::RequestConfig;

pub use directus::{DirectusConnector, DirectusSession};
pub use schema::{CollectionSchema, FieldSchema, Schema};

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

/// Who the session is acting as once authenticated.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    /// No credential was supplied; the backend's public role applies.
    Anonymous,
    /// The user record the credential resolved to.
    User(Value),
}

impl Identity {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => user.get("id").and_then(Value::as_str),
        }
    }
}

/// A single call against the backend REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    /// Path relative to the backend base URL, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl BackendRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds the query parameter only when a value is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// An authenticated handle to the backend, owned by one request.
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Performs the credential handshake.
    async fn authenticate(&self) -> Result<Identity, BackendError>;

    /// Introspects the backend data model. One network round trip.
    async fn fetch_schema(&self) -> Result<Schema, BackendError>;

    /// Executes a request and returns the unwrapped `data` payload.
    async fn request(&self, request: BackendRequest) -> Result<Value, BackendError>;
}

/// Creates sessions bound to a request's configuration. Must not do I/O.
pub trait BackendConnector: Send + Sync {
    fn connect(&self, config: &RequestConfig) -> Result<Arc<dyn BackendSession>, BackendError>;
}
