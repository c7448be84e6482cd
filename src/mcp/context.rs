//! MCP Tool Execution Context
//!
//! Provides access to the request's backend session for tool implementations.

use std::sync::Arc;

use crate::backend::{BackendSession, Schema};

/// Context provided to tool handlers during execution
#[derive(Clone)]
pub struct ToolContext {
    /// The authenticated backend session of the current request
    pub session: Arc<dyn BackendSession>,

    /// Schema resolved for the caller at bootstrap
    pub schema: Arc<Schema>,

    /// Base URL of the backend, for building links in tool output
    pub base_url: String,

    /// Text returned by the `system-prompt` tool
    pub system_prompt: String,
}

impl ToolContext {
    /// Link to an asset served by the backend.
    pub fn asset_url(&self, file_id: &str) -> String {
        format!("{}/assets/{}", self.base_url, file_id)
    }
}
