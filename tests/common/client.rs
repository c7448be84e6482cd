//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest and speaks JSON-RPC to the `/mcp` endpoint.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// HTTP test client bound to one backend credential
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as `access_token` on every MCP request, if set
    pub token: Option<String>,
    next_id: AtomicU64,
}

impl TestClient {
    /// Creates a client that calls the server without a credential
    pub fn anonymous(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a client that authenticates every request with `token`
    pub fn with_token(base_url: String, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..Self::anonymous(base_url)
        }
    }

    fn mcp_url(&self) -> String {
        format!("{}/mcp", self.base_url)
    }

    // ========================================================================
    // Raw HTTP
    // ========================================================================

    /// GET the health endpoint
    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    /// POST an arbitrary JSON body to `/mcp`
    pub async fn post_mcp(&self, body: &Value) -> Response {
        let mut request = self.client.post(self.mcp_url()).json(body);
        if let Some(token) = &self.token {
            request = request.query(&[("access_token", token)]);
        }
        request.send().await.expect("MCP request failed")
    }

    /// POST a raw body with an explicit content type to `/mcp`
    pub async fn post_mcp_raw(&self, content_type: &str, body: &'static str) -> Response {
        let mut request = self
            .client
            .post(self.mcp_url())
            .header("content-type", content_type)
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("MCP request failed")
    }

    pub async fn get_mcp(&self) -> Response {
        self.client
            .get(self.mcp_url())
            .send()
            .await
            .expect("GET /mcp failed")
    }

    pub async fn delete_mcp(&self) -> Response {
        self.client
            .delete(self.mcp_url())
            .send()
            .await
            .expect("DELETE /mcp failed")
    }

    // ========================================================================
    // JSON-RPC
    // ========================================================================

    /// Sends one JSON-RPC request and returns the decoded envelope
    ///
    /// # Panics
    ///
    /// Panics if the HTTP status is not 200.
    pub async fn rpc(&self, method: &str, params: Option<Value>) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut body = json!({"jsonrpc": "2.0", "id": id, "method": method});
        if let Some(params) = params {
            body["params"] = params;
        }

        let response = self.post_mcp(&body).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "{} returned {}",
            method,
            response.status()
        );
        let envelope: Value = response.json().await.expect("Invalid JSON response");
        assert_eq!(envelope["id"], json!(id));
        envelope
    }

    /// Sends a request and returns its `result`, panicking on an error envelope
    pub async fn rpc_result(&self, method: &str, params: Option<Value>) -> Value {
        let envelope = self.rpc(method, params).await;
        assert!(
            envelope.get("error").is_none(),
            "{} failed: {}",
            method,
            envelope["error"]
        );
        envelope["result"].clone()
    }

    pub async fn list_tools(&self) -> Vec<String> {
        let result = self.rpc_result("tools/list", None).await;
        result["tools"]
            .as_array()
            .expect("tools must be an array")
            .iter()
            .map(|tool| tool["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Calls a tool and returns the `CallToolResult`
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Value {
        self.rpc_result(
            "tools/call",
            Some(json!({"name": name, "arguments": arguments})),
        )
        .await
    }

    pub async fn list_prompts(&self) -> Vec<String> {
        let result = self.rpc_result("prompts/list", None).await;
        result["prompts"]
            .as_array()
            .expect("prompts must be an array")
            .iter()
            .map(|prompt| prompt["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Gets a prompt, returning the whole envelope so errors can be checked
    pub async fn get_prompt(&self, name: &str, arguments: Value) -> Value {
        self.rpc(
            "prompts/get",
            Some(json!({"name": name, "arguments": arguments})),
        )
        .await
    }
}

/// Text of the first content block of a tool result
pub fn tool_text(result: &Value) -> &str {
    result["content"][0]["text"]
        .as_str()
        .expect("tool result must carry text content")
}

/// Parses the text of a successful tool result as JSON
pub fn tool_json(result: &Value) -> Value {
    assert_ne!(
        result["isError"],
        json!(true),
        "tool failed: {}",
        tool_text(result)
    );
    serde_json::from_str(tool_text(result)).expect("tool text must be JSON")
}
