//! File Tools

use serde::Deserialize;
use serde_json::{json, Value};

use super::{query_properties, QueryParams};
use crate::backend::BackendRequest;
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ToolsCallResult;
use crate::mcp::registry::{RegisteredTool, ToolArgs, ToolBuilder, ToolError, ToolRegistry, ToolResult};

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(read_files_tool());
}

#[derive(Debug, Deserialize)]
pub struct ReadFilesParams {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    query: QueryParams,
}

impl ToolArgs for ReadFilesParams {
    fn validate(&self) -> Result<(), String> {
        if let Some(id) = &self.id {
            if id.is_empty() || id.contains(['/', '?', '#']) {
                return Err(format!("Invalid file id: {}", id));
            }
        }
        self.query.validate()
    }
}

fn read_files_tool() -> RegisteredTool {
    ToolBuilder::new("read-files")
        .description(
            "Read file metadata (title, type, size, dimensions, folder). Each file \
             includes an `asset_url` pointing at its content.",
        )
        .title("Read Files")
        .read_only()
        .input_schema(json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "Id of a single file to read"
                },
                "query": query_properties()
            }
        }))
        .build(read_files_handler)
}

async fn read_files_handler(ctx: ToolContext, params: ReadFilesParams) -> ToolResult {
    let request = match &params.id {
        Some(id) => BackendRequest::get(format!("/files/{}", id)),
        None => BackendRequest::get("/files"),
    };
    let request = params.query.apply(request)?;

    let mut files = ctx.session.request(request).await?;
    match &mut files {
        Value::Array(entries) => entries.iter_mut().for_each(|file| add_asset_url(&ctx, file)),
        file @ Value::Object(_) => add_asset_url(&ctx, file),
        _ => {}
    }

    ToolsCallResult::json(&files).map_err(|e| ToolError::Execution(e.to_string()))
}

fn add_asset_url(ctx: &ToolContext, file: &mut Value) {
    let Some(id) = file.get("id").and_then(Value::as_str).map(str::to_string) else {
        return;
    };
    if let Value::Object(map) = file {
        map.insert("asset_url".to_string(), Value::String(ctx.asset_url(&id)));
    }
}
