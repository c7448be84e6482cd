//! Schema Tools
//!
//! Exposes the caller's data model, as resolved at bootstrap.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;

use crate::backend::CollectionSchema;
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ToolsCallResult;
use crate::mcp::registry::{RegisteredTool, ToolArgs, ToolBuilder, ToolError, ToolRegistry, ToolResult};

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(read_collections_tool());
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadCollectionsParams {
    /// Restrict the output to these collections
    #[serde(default)]
    collections: Option<Vec<String>>,
}

impl ToolArgs for ReadCollectionsParams {}

fn read_collections_tool() -> RegisteredTool {
    ToolBuilder::new("read-collections")
        .description(
            "Describe the collections available to the current user, with their fields, \
             field types and whether they are required. Call this before reading or \
             writing items.",
        )
        .title("Read Collections")
        .read_only()
        .idempotent()
        .input_schema(json!({
            "type": "object",
            "properties": {
                "collections": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Only describe these collections"
                }
            }
        }))
        .build(read_collections_handler)
}

async fn read_collections_handler(ctx: ToolContext, params: ReadCollectionsParams) -> ToolResult {
    let selected: BTreeMap<&str, &CollectionSchema> = match &params.collections {
        None => ctx
            .schema
            .collections
            .iter()
            .map(|(name, collection)| (name.as_str(), collection))
            .collect(),
        Some(names) => names
            .iter()
            .map(|name| {
                ctx.schema
                    .collection(name)
                    .map(|collection| (name.as_str(), collection))
                    .ok_or_else(|| ToolError::UnknownCollection(name.clone()))
            })
            .collect::<Result<_, _>>()?,
    };

    ToolsCallResult::json(&selected).map_err(|e| ToolError::Execution(e.to_string()))
}
