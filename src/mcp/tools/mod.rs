//! MCP Tools
//!
//! Tool implementations for items, files, schema and users.

pub mod collections;
pub mod files;
pub mod items;
pub mod markdown;
pub mod system;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::context::ToolContext;
use super::registry::{ToolError, ToolRegistry};
use crate::backend::BackendRequest;

lazy_static! {
    /// Every tool the server knows about. Requests filter this per config.
    pub static ref TOOLS: ToolRegistry = {
        let mut registry = ToolRegistry::new();
        register_all_tools(&mut registry);
        registry
    };
}

/// Register all tools with the registry
pub fn register_all_tools(registry: &mut ToolRegistry) {
    system::register_tools(registry);
    collections::register_tools(registry);
    items::register_tools(registry);
    files::register_tools(registry);
    markdown::register_tools(registry);
}

/// Fails unless the caller's schema contains `collection`.
pub(crate) fn ensure_collection(ctx: &ToolContext, collection: &str) -> Result<(), ToolError> {
    if ctx.schema.has_collection(collection) {
        Ok(())
    } else {
        Err(ToolError::UnknownCollection(collection.to_string()))
    }
}

/// Primary key of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemKey {
    Number(i64),
    String(String),
}

/// Query options shared by the read tools.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    fields: Option<Vec<String>>,
    #[serde(default)]
    filter: Option<Value>,
    #[serde(default)]
    sort: Option<Vec<String>>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default)]
    page: Option<u64>,
    #[serde(default)]
    search: Option<String>,
}

impl QueryParams {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(limit) = self.limit {
            if limit < -1 {
                return Err("limit must be -1 (no limit) or greater".to_string());
            }
        }
        if let Some(filter) = &self.filter {
            if !filter.is_object() {
                return Err("filter must be an object".to_string());
            }
        }
        Ok(())
    }

    /// Adds the options to `request` as backend query parameters.
    pub fn apply(self, request: BackendRequest) -> Result<BackendRequest, ToolError> {
        let filter = self
            .filter
            .map(|filter| serde_json::to_string(&filter))
            .transpose()
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(request
            .query_opt("fields", self.fields.map(|f| f.join(",")))
            .query_opt("filter", filter)
            .query_opt("sort", self.sort.map(|s| s.join(",")))
            .query_opt("limit", self.limit.map(|l| l.to_string()))
            .query_opt("offset", self.offset.map(|o| o.to_string()))
            .query_opt("page", self.page.map(|p| p.to_string()))
            .query_opt("search", self.search))
    }
}

/// JSON Schema of [`QueryParams`].
pub(crate) fn query_properties() -> Value {
    json!({
        "type": "object",
        "properties": {
            "fields": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Fields to return, dot notation for relations (e.g. author.name)"
            },
            "filter": {
                "type": "object",
                "description": "Filter rules, e.g. {\"status\": {\"_eq\": \"published\"}}"
            },
            "sort": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Fields to sort by, prefix with - for descending"
            },
            "limit": {"type": "integer", "description": "Maximum number of results, -1 for all"},
            "offset": {"type": "integer", "minimum": 0},
            "page": {"type": "integer", "minimum": 1},
            "search": {"type": "string", "description": "Full text search"}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_names_are_unique() {
        let names: Vec<_> = TOOLS
            .active(&crate::config::ToolSettings::default())
            .names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.len(), TOOLS.tool_count());
    }

    #[test]
    fn test_static_tool_set() {
        let mut names: Vec<_> = TOOLS
            .active(&crate::config::ToolSettings::default())
            .names();
        names.sort();
        assert_eq!(
            names,
            vec![
                "create-item",
                "delete-item",
                "markdown-tool",
                "read-collections",
                "read-files",
                "read-items",
                "system-prompt",
                "update-item",
                "users-me",
            ]
        );
    }

    #[test]
    fn test_only_mutating_tools_lack_read_only_hint() {
        let settings = crate::config::ToolSettings::default();
        for definition in TOOLS.active(&settings).definitions() {
            let mutating = matches!(
                definition.name.as_str(),
                "create-item" | "update-item" | "delete-item"
            );
            assert_eq!(
                definition.annotations.read_only_hint == Some(true),
                !mutating,
                "{}",
                definition.name
            );
        }
    }

    #[test]
    fn test_query_params_to_backend_query() {
        let params: QueryParams = serde_json::from_value(json!({
            "fields": ["id", "title"],
            "filter": {"status": {"_eq": "published"}},
            "sort": ["-date_created"],
            "limit": 5
        }))
        .unwrap();
        let request = params.apply(BackendRequest::get("/items/articles")).unwrap();

        assert_eq!(
            request.query,
            vec![
                ("fields".to_string(), "id,title".to_string()),
                (
                    "filter".to_string(),
                    r#"{"status":{"_eq":"published"}}"#.to_string()
                ),
                ("sort".to_string(), "-date_created".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_params_validation() {
        let bad_limit: QueryParams = serde_json::from_value(json!({"limit": -5})).unwrap();
        assert!(bad_limit.validate().is_err());

        let bad_filter: QueryParams = serde_json::from_value(json!({"filter": "x"})).unwrap();
        assert!(bad_filter.validate().is_err());

        assert!(QueryParams::default().validate().is_ok());
    }

    #[test]
    fn test_item_keys_accept_numbers_and_strings() {
        let keys: Vec<ItemKey> = serde_json::from_value(json!([3, "abc"])).unwrap();
        assert_eq!(keys, vec![ItemKey::Number(3), ItemKey::String("abc".into())]);
        assert_eq!(json!(keys), json!([3, "abc"]));
    }
}
