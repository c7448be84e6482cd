//! System Tools
//!
//! The system prompt and the identity of the caller.

use serde::Deserialize;
use serde_json::json;

use crate::backend::BackendRequest;
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ToolsCallResult;
use crate::mcp::registry::{
    NoArgs, RegisteredTool, ToolArgs, ToolBuilder, ToolError, ToolRegistry, ToolResult,
    SYSTEM_PROMPT_TOOL,
};

/// Register system tools with the registry
pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(system_prompt_tool());
    registry.register_tool(users_me_tool());
}

// ============================================================================
// system-prompt
// ============================================================================

fn system_prompt_tool() -> RegisteredTool {
    ToolBuilder::new(SYSTEM_PROMPT_TOOL)
        .description(
            "IMPORTANT! Call this tool first. It returns the instructions for working \
             with this Directus instance.",
        )
        .title("System Prompt")
        .read_only()
        .idempotent()
        .build(system_prompt_handler)
}

async fn system_prompt_handler(ctx: ToolContext, _params: NoArgs) -> ToolResult {
    Ok(ToolsCallResult::text(ctx.system_prompt))
}

// ============================================================================
// users-me
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct UsersMeParams {
    #[serde(default)]
    fields: Option<Vec<String>>,
}

impl ToolArgs for UsersMeParams {}

fn users_me_tool() -> RegisteredTool {
    ToolBuilder::new("users-me")
        .description("Retrieve information about the current user.")
        .title("Get Current User")
        .read_only()
        .input_schema(json!({
            "type": "object",
            "properties": {
                "fields": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Fields to return, defaults to all"
                }
            }
        }))
        .build(users_me_handler)
}

async fn users_me_handler(ctx: ToolContext, params: UsersMeParams) -> ToolResult {
    let fields = params
        .fields
        .map(|fields| fields.join(","))
        .unwrap_or_else(|| "*".to_string());

    let user = ctx
        .session
        .request(BackendRequest::get("/users/me").query("fields", fields))
        .await?;

    ToolsCallResult::json(&user).map_err(|e| ToolError::Execution(e.to_string()))
}
