//! Markdown Tool
//!
//! Converts between HTML and Markdown. Does not touch the backend.

use pulldown_cmark::{html, Options, Parser};
use serde::Deserialize;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ToolsCallResult;
use crate::mcp::registry::{RegisteredTool, ToolArgs, ToolBuilder, ToolError, ToolRegistry, ToolResult};

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register_tool(markdown_tool());
}

#[derive(Debug, Deserialize)]
pub struct MarkdownParams {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

impl ToolArgs for MarkdownParams {
    fn validate(&self) -> Result<(), String> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|s| !s.is_empty());
        if present(&self.html) || present(&self.markdown) {
            Ok(())
        } else {
            Err("Either html or markdown must be provided".to_string())
        }
    }
}

fn markdown_tool() -> RegisteredTool {
    ToolBuilder::new("markdown-tool")
        .description("Convert HTML to Markdown or Markdown to HTML.")
        .title("Markdown Tool")
        .read_only()
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "html": {
                    "type": "string",
                    "description": "HTML string to convert to Markdown"
                },
                "markdown": {
                    "type": "string",
                    "description": "Markdown string to convert to HTML"
                }
            }
        }))
        .build(markdown_handler)
}

async fn markdown_handler(_ctx: ToolContext, params: MarkdownParams) -> ToolResult {
    match (params.html, params.markdown) {
        (Some(html), _) if !html.is_empty() => Ok(ToolsCallResult::text(html_to_markdown(&html)?)),
        (_, Some(markdown)) if !markdown.is_empty() => {
            Ok(ToolsCallResult::text(markdown_to_html(&markdown)))
        }
        _ => Err(ToolError::Execution("No input provided".to_string())),
    }
}

/// HTML to Markdown with ATX (`#`) headings.
pub fn html_to_markdown(html: &str) -> Result<String, ToolError> {
    htmd::convert(html).map_err(|e| ToolError::Execution(format!("Failed to convert HTML: {}", e)))
}

/// Markdown to sanitized HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, parser);

    ammonia::clean(&rendered)
}
