//! Per-request configuration.
//!
//! Every MCP request carries its own credential, so the configuration used
//! to talk to the backend is derived fresh for each request from the
//! request inputs and the process-wide [`AppConfig`].

use axum::http::{header, HeaderMap};

use super::{AppConfig, PromptSettings, ToolSettings};

/// Raw inputs taken from the incoming HTTP request.
#[derive(Debug, Clone, Default)]
pub struct RequestInputs {
    /// Value of the `access_token` query parameter.
    pub access_token: Option<String>,
    /// Token from an `Authorization: Bearer` header.
    pub bearer_token: Option<String>,
}

impl RequestInputs {
    pub fn from_parts(access_token: Option<String>, headers: &HeaderMap) -> Self {
        let bearer_token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                let (scheme, token) = value.split_once(' ')?;
                scheme
                    .eq_ignore_ascii_case("bearer")
                    .then(|| token.trim().to_string())
            });

        Self {
            access_token,
            bearer_token,
        }
    }
}

/// Immutable configuration scoped to a single MCP request.
#[derive(Clone, PartialEq)]
pub struct RequestConfig {
    pub credential: Option<String>,
    pub backend_url: String,
    pub timeout_sec: u64,
    pub tools: ToolSettings,
    pub prompts: PromptSettings,
}

impl std::fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestConfig")
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("backend_url", &self.backend_url)
            .field("timeout_sec", &self.timeout_sec)
            .field("tools", &self.tools)
            .field("prompts", &self.prompts)
            .finish()
    }
}

impl RequestConfig {
    /// Fill in every field with the best value available. Never fails: a
    /// missing credential simply yields an anonymous configuration.
    pub fn resolve(inputs: RequestInputs, defaults: &AppConfig) -> Self {
        let credential = non_empty(inputs.access_token).or_else(|| non_empty(inputs.bearer_token));

        Self {
            credential,
            backend_url: defaults.backend_url.clone(),
            timeout_sec: defaults.backend_timeout_sec,
            tools: defaults.tools.clone(),
            prompts: defaults.prompts.clone(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.credential.is_none()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
