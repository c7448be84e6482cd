//! MCP Protocol Server
//!
//! One `McpServer` exists per HTTP request. It answers protocol messages
//! using the tools and prompts resolved for that request's caller.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::context::ToolContext;
use super::prompts::PromptRegistry;
use super::protocol::{
    methods, InitializeParams, InitializeResult, McpError, McpRequest, McpResponse, PingResult,
    PromptsCapability, PromptsGetParams, PromptsListResult, ServerCapabilities, ServerInfo,
    ToolsCallParams, ToolsCallResult, ToolsCapability, ToolsListResult, MCP_PROTOCOL_VERSION,
    SERVER_NAME,
};
use super::registry::ActiveTools;
use crate::server::metrics;

/// Lifecycle of a per-request server. Only `Serving` answers requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    Uninitialized,
    Bootstrapped,
    Serving,
    Closed,
}

/// What a bootstrapped server can offer its caller.
struct Capabilities {
    context: ToolContext,
    tools: ActiveTools<'static>,
    prompts: PromptRegistry,
}

pub struct McpServer {
    phase: ServerPhase,
    capabilities: Option<Capabilities>,
}

impl McpServer {
    pub fn new() -> Self {
        Self {
            phase: ServerPhase::Uninitialized,
            capabilities: None,
        }
    }

    pub fn phase(&self) -> ServerPhase {
        self.phase
    }

    /// Installs the caller's tools and prompts.
    pub fn bootstrap(
        &mut self,
        context: ToolContext,
        tools: ActiveTools<'static>,
        prompts: PromptRegistry,
    ) -> Result<(), McpError> {
        if self.phase != ServerPhase::Uninitialized {
            return Err(McpError::InternalError(format!(
                "Cannot bootstrap a server in phase {:?}",
                self.phase
            )));
        }
        self.capabilities = Some(Capabilities {
            context,
            tools,
            prompts,
        });
        self.phase = ServerPhase::Bootstrapped;
        Ok(())
    }

    /// Attaches the server to its transport.
    pub fn connect(&mut self) -> Result<(), McpError> {
        if self.phase != ServerPhase::Bootstrapped {
            return Err(McpError::InternalError(format!(
                "Cannot connect a server in phase {:?}",
                self.phase
            )));
        }
        self.phase = ServerPhase::Serving;
        Ok(())
    }

    /// Releases the server. Returns false if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.phase == ServerPhase::Closed {
            return false;
        }
        self.capabilities = None;
        self.phase = ServerPhase::Closed;
        true
    }

    /// Handle a single MCP message. Notifications get no response.
    pub async fn handle(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id.clone() else {
            debug!("MCP notification {}", request.method);
            metrics::record_mcp_message(metric_method(&request.method), "ok");
            return None;
        };

        let result = match self.serving() {
            Ok(capabilities) => self.dispatch(capabilities, &request).await,
            Err(e) => Err(e),
        };

        let method = metric_method(&request.method);
        Some(match result {
            Ok(value) => {
                metrics::record_mcp_message(method, "ok");
                McpResponse::success(id, value)
            }
            Err(error) => {
                debug!("MCP {} failed: {}", request.method, error.message());
                metrics::record_mcp_message(method, "error");
                McpResponse::error(Some(id), error)
            }
        })
    }

    fn serving(&self) -> Result<&Capabilities, McpError> {
        match (&self.phase, &self.capabilities) {
            (ServerPhase::Serving, Some(capabilities)) => Ok(capabilities),
            (phase, _) => Err(McpError::InternalError(format!(
                "Server is not serving (phase {:?})",
                phase
            ))),
        }
    }

    async fn dispatch(
        &self,
        capabilities: &Capabilities,
        request: &McpRequest,
    ) -> Result<Value, McpError> {
        match request.method.as_str() {
            methods::INITIALIZE => handle_initialize(request),
            methods::PING => to_value(PingResult {}),
            methods::TOOLS_LIST => to_value(ToolsListResult {
                tools: capabilities.tools.definitions(),
            }),
            methods::TOOLS_CALL => {
                let params: ToolsCallParams = required_params(request)?;
                let result = call_tool(capabilities, params).await;
                to_value(result)
            }
            methods::PROMPTS_LIST => to_value(PromptsListResult {
                prompts: capabilities.prompts.list(),
            }),
            methods::PROMPTS_GET => {
                let params: PromptsGetParams = required_params(request)?;
                let result = capabilities
                    .prompts
                    .get(&params.name, params.arguments.as_ref())?;
                to_value(result)
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Method label for metrics; arbitrary client method names are collapsed.
fn metric_method(method: &str) -> &str {
    match method {
        methods::INITIALIZE
        | methods::PING
        | methods::TOOLS_LIST
        | methods::TOOLS_CALL
        | methods::PROMPTS_LIST
        | methods::PROMPTS_GET => method,
        _ => "unknown",
    }
}

fn to_value<T: Serialize>(result: T) -> Result<Value, McpError> {
    serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
}

fn required_params<T: DeserializeOwned>(request: &McpRequest) -> Result<T, McpError> {
    request
        .params
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams("Missing params".to_string()))
}

fn handle_initialize(request: &McpRequest) -> Result<Value, McpError> {
    let params: Option<InitializeParams> = request
        .params
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?;

    if let Some(client) = params.as_ref().and_then(|p| p.client_info.as_ref()) {
        debug!(
            "MCP initialize from {} {}",
            client.name,
            client.version.as_deref().unwrap_or("")
        );
    }

    to_value(InitializeResult {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability::default(),
            prompts: PromptsCapability::default(),
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

/// Runs a tool. Every failure becomes an `isError` result.
async fn call_tool(capabilities: &Capabilities, params: ToolsCallParams) -> ToolsCallResult {
    let Some(tool) = capabilities.tools.get(&params.name) else {
        warn!("Unknown tool requested: {}", params.name);
        return ToolsCallResult::error(format!("Unknown tool: {}", params.name));
    };

    let ctx = capabilities.context.clone();
    let arguments = params.arguments.unwrap_or(Value::Null);
    let start = Instant::now();

    let outcome = AssertUnwindSafe(async { (tool.handler)(ctx, arguments).await })
        .catch_unwind()
        .await;

    let (result, label) = match outcome {
        Ok(Ok(result)) => (result, "success"),
        Ok(Err(e)) => {
            warn!("Tool {} failed: {}", tool.name, e);
            (ToolsCallResult::error(e.to_string()), "error")
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Tool {} panicked: {}", tool.name, message);
            (ToolsCallResult::error(message), "panic")
        }
    };
    metrics::record_tool_call(&tool.name, label, start.elapsed());

    result
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Tool execution panicked".to_string()
    }
}
