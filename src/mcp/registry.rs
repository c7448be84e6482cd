//! MCP Tool Registry
//!
//! Manages registration and lookup of tools. The full set of tools is built
//! once per process; each request works on the subset its configuration
//! enables.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::context::ToolContext;
use super::protocol::{ToolAnnotations, ToolDefinition, ToolsCallResult};
use crate::backend::BackendError;
use crate::config::ToolSettings;

// ============================================================================
// Tool Types
// ============================================================================

/// Errors a tool can end with. All of them reach the caller as an
/// `isError` tool result, never as a protocol error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Execution(String),
}

/// Result type for tool execution
pub type ToolResult = Result<ToolsCallResult, ToolError>;

/// Boxed future for async tool execution
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Type-erased tool handler: validates the raw arguments, then runs the tool.
pub type ToolHandler = Arc<dyn Fn(ToolContext, Value) -> ToolFuture + Send + Sync>;

/// Typed input contract of a tool.
///
/// Deserialization checks the shape; `validate` adds the refinements serde
/// cannot express (e.g. "one of these two fields must be set").
pub trait ToolArgs: DeserializeOwned + Send + 'static {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Arguments of tools that take none. Unknown keys are ignored.
#[derive(Debug, Default, serde::Deserialize)]
pub struct NoArgs {}

impl ToolArgs for NoArgs {}

/// Decode and validate raw call arguments. Missing arguments count as `{}`.
pub fn parse_args<A: ToolArgs>(raw: Value) -> Result<A, ToolError> {
    let raw = if raw.is_null() {
        Value::Object(Default::default())
    } else {
        raw
    };
    let args: A =
        serde_json::from_value(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    args.validate().map_err(ToolError::InvalidArguments)?;
    Ok(args)
}

/// A registered tool with metadata and handler
pub struct RegisteredTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
    pub handler: ToolHandler,
}

impl RegisteredTool {
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry for MCP tools, in registration order
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Tool names must be unique.
    pub fn register_tool(&mut self, tool: RegisteredTool) {
        assert!(
            self.get_tool(&tool.name).is_none(),
            "tool {} registered twice",
            tool.name
        );
        self.tools.push(tool);
    }

    /// Get a tool by exact name
    pub fn get_tool(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// The tools a request with the given settings may see and call.
    pub fn active(&self, settings: &ToolSettings) -> ActiveTools<'_> {
        let tools = self
            .tools
            .iter()
            .filter(|tool| !settings.is_disabled(&tool.name))
            .filter(|tool| settings.system_prompt_enabled || tool.name != SYSTEM_PROMPT_TOOL)
            .collect();
        ActiveTools { tools }
    }

    /// Get the number of registered tools
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Name of the tool that is hidden when the system prompt is turned off.
pub const SYSTEM_PROMPT_TOOL: &str = "system-prompt";

/// The per-request view over the process-wide tool registry.
pub struct ActiveTools<'a> {
    tools: Vec<&'a RegisteredTool>,
}

impl<'a> ActiveTools<'a> {
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&'a RegisteredTool> {
        self.tools.iter().copied().find(|tool| tool.name == name)
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.tools.iter().map(|tool| tool.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// Builder helpers
// ============================================================================

/// Builder for registering a tool
pub struct ToolBuilder {
    name: String,
    description: String,
    input_schema: Value,
    annotations: ToolAnnotations,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            annotations: ToolAnnotations::default(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.annotations.title = Some(title.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.annotations.read_only_hint = Some(true);
        self
    }

    pub fn destructive(mut self) -> Self {
        self.annotations.read_only_hint = Some(false);
        self.annotations.destructive_hint = Some(true);
        self
    }

    pub fn idempotent(mut self) -> Self {
        self.annotations.idempotent_hint = Some(true);
        self
    }

    pub fn build<A, F, Fut>(self, handler: F) -> RegisteredTool
    where
        A: ToolArgs,
        F: Fn(ToolContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        RegisteredTool {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
            annotations: self.annotations,
            handler: Arc::new(move |ctx: ToolContext, raw: Value| -> ToolFuture {
                match parse_args::<A>(raw) {
                    Ok(args) => Box::pin(handler(ctx, args)),
                    Err(err) => Box::pin(async move { Err(err) }),
                }
            }),
        }
    }
}
