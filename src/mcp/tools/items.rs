//! Item Tools
//!
//! CRUD over the items of user collections.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{ensure_collection, query_properties, ItemKey, QueryParams};
use crate::backend::BackendRequest;
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ToolsCallResult;
use crate::mcp::registry::{RegisteredTool, ToolArgs, ToolBuilder, ToolError, ToolRegistry, ToolResult};

/// Register item tools with the registry
pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(read_items_tool());
    registry.register_tool(create_item_tool());
    registry.register_tool(update_item_tool());
    registry.register_tool(delete_item_tool());
}

fn items_path(collection: &str) -> String {
    format!("/items/{}", collection)
}

fn to_result(value: &Value) -> ToolResult {
    ToolsCallResult::json(value).map_err(|e| ToolError::Execution(e.to_string()))
}

// ============================================================================
// read-items
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReadItemsParams {
    collection: String,
    #[serde(default)]
    query: QueryParams,
}

impl ToolArgs for ReadItemsParams {
    fn validate(&self) -> Result<(), String> {
        self.query.validate()
    }
}

fn read_items_tool() -> RegisteredTool {
    ToolBuilder::new("read-items")
        .description(
            "Read items from a collection. Supports field selection, filters, sorting, \
             pagination and full text search.",
        )
        .title("Read Items")
        .read_only()
        .input_schema(json!({
            "type": "object",
            "properties": {
                "collection": {
                    "type": "string",
                    "description": "Name of the collection to read from"
                },
                "query": query_properties()
            },
            "required": ["collection"]
        }))
        .build(read_items_handler)
}

async fn read_items_handler(ctx: ToolContext, params: ReadItemsParams) -> ToolResult {
    ensure_collection(&ctx, &params.collection)?;

    let request = params
        .query
        .apply(BackendRequest::get(items_path(&params.collection)))?;
    let items = ctx.session.request(request).await?;

    to_result(&items)
}

// ============================================================================
// create-item
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateItemParams {
    collection: String,
    data: Value,
    #[serde(default)]
    fields: Option<Vec<String>>,
}

impl ToolArgs for CreateItemParams {
    fn validate(&self) -> Result<(), String> {
        match &self.data {
            Value::Object(_) => Ok(()),
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                Ok(())
            }
            _ => Err("data must be an object or a non-empty array of objects".to_string()),
        }
    }
}

fn create_item_tool() -> RegisteredTool {
    ToolBuilder::new("create-item")
        .description("Create one or more items in a collection.")
        .title("Create Item")
        .input_schema(json!({
            "type": "object",
            "properties": {
                "collection": {
                    "type": "string",
                    "description": "Name of the collection to create items in"
                },
                "data": {
                    "description": "A single item object, or an array of item objects",
                    "oneOf": [
                        {"type": "object"},
                        {"type": "array", "items": {"type": "object"}}
                    ]
                },
                "fields": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Fields to return for the created items"
                }
            },
            "required": ["collection", "data"]
        }))
        .build(create_item_handler)
}

async fn create_item_handler(ctx: ToolContext, params: CreateItemParams) -> ToolResult {
    ensure_collection(&ctx, &params.collection)?;

    let request = BackendRequest::post(items_path(&params.collection))
        .query_opt("fields", params.fields.map(|f| f.join(",")))
        .json(params.data);
    let created = ctx.session.request(request).await?;

    to_result(&created)
}

// ============================================================================
// update-item
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateItemParams {
    collection: String,
    keys: Vec<ItemKey>,
    data: Value,
    #[serde(default)]
    fields: Option<Vec<String>>,
}

impl ToolArgs for UpdateItemParams {
    fn validate(&self) -> Result<(), String> {
        if self.keys.is_empty() {
            return Err("keys must contain at least one key".to_string());
        }
        if !self.data.is_object() {
            return Err("data must be an object".to_string());
        }
        Ok(())
    }
}

fn update_item_tool() -> RegisteredTool {
    ToolBuilder::new("update-item")
        .description("Update items of a collection by primary key. Every listed item receives the same data.")
        .title("Update Item")
        .idempotent()
        .input_schema(json!({
            "type": "object",
            "properties": {
                "collection": {
                    "type": "string",
                    "description": "Name of the collection"
                },
                "keys": {
                    "type": "array",
                    "items": {"type": ["string", "number"]},
                    "description": "Primary keys of the items to update"
                },
                "data": {
                    "type": "object",
                    "description": "Partial item with the fields to change"
                },
                "fields": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Fields to return for the updated items"
                }
            },
            "required": ["collection", "keys", "data"]
        }))
        .build(update_item_handler)
}

async fn update_item_handler(ctx: ToolContext, params: UpdateItemParams) -> ToolResult {
    ensure_collection(&ctx, &params.collection)?;

    let request = BackendRequest::patch(items_path(&params.collection))
        .query_opt("fields", params.fields.map(|f| f.join(",")))
        .json(json!({
            "keys": params.keys,
            "data": params.data,
        }));
    let updated = ctx.session.request(request).await?;

    to_result(&updated)
}

// ============================================================================
// delete-item
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DeleteItemParams {
    collection: String,
    keys: Vec<ItemKey>,
}

impl ToolArgs for DeleteItemParams {
    fn validate(&self) -> Result<(), String> {
        if self.keys.is_empty() {
            Err("keys must contain at least one key".to_string())
        } else {
            Ok(())
        }
    }
}

fn delete_item_tool() -> RegisteredTool {
    ToolBuilder::new("delete-item")
        .description("Delete items of a collection by primary key. This cannot be undone.")
        .title("Delete Item")
        .destructive()
        .input_schema(json!({
            "type": "object",
            "properties": {
                "collection": {
                    "type": "string",
                    "description": "Name of the collection"
                },
                "keys": {
                    "type": "array",
                    "items": {"type": ["string", "number"]},
                    "description": "Primary keys of the items to delete"
                }
            },
            "required": ["collection", "keys"]
        }))
        .build(delete_item_handler)
}

async fn delete_item_handler(ctx: ToolContext, params: DeleteItemParams) -> ToolResult {
    ensure_collection(&ctx, &params.collection)?;

    let count = params.keys.len();
    let request =
        BackendRequest::delete(items_path(&params.collection)).json(json!(params.keys));
    ctx.session.request(request).await?;

    to_result(&json!({
        "collection": params.collection,
        "deleted": params.keys,
        "count": count,
    }))
}
