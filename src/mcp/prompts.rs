//! MCP Prompt Registry
//!
//! Prompts are records of a backend collection. Each record carries an
//! optional system prompt and a list of messages; `{{ variable }}`
//! placeholders in their text become the prompt's arguments.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::protocol::{
    McpError, PromptArgument, PromptMessage, PromptRole, PromptSummary, PromptsGetResult,
    ToolResultContent,
};
use crate::backend::{BackendRequest, BackendSession, Schema};
use crate::config::PromptSettings;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex");
}

const PROMPT_FIELDS: &str = "name,description,system_prompt,messages";

/// One message template of a prompt record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageTemplate {
    pub role: PromptRole,
    pub text: String,
}

/// A record of the prompts collection, as stored in the backend.
#[derive(Debug, Deserialize)]
struct PromptRecord {
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    messages: Option<Vec<MessageTemplate>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptDefinition {
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub messages: Vec<MessageTemplate>,
    /// Placeholder names, in order of first appearance
    pub arguments: Vec<String>,
}

impl PromptDefinition {
    fn from_record(record: PromptRecord) -> Result<Self, String> {
        let name = record
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "prompt has no name".to_string())?;

        let system_prompt = record.system_prompt.filter(|s| !s.trim().is_empty());
        let messages = record.messages.unwrap_or_default();
        if system_prompt.is_none() && messages.is_empty() {
            return Err(format!("prompt {} has neither system prompt nor messages", name));
        }

        let mut arguments = Vec::new();
        let texts = system_prompt
            .iter()
            .map(String::as_str)
            .chain(messages.iter().map(|m| m.text.as_str()));
        for text in texts {
            for variable in placeholders(text) {
                if !arguments.contains(&variable) {
                    arguments.push(variable);
                }
            }
        }

        Ok(Self {
            name,
            description: record.description.filter(|d| !d.is_empty()),
            system_prompt,
            messages,
            arguments,
        })
    }

    pub fn summary(&self) -> PromptSummary {
        PromptSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|name| PromptArgument {
                    name: name.clone(),
                    description: None,
                    required: true,
                })
                .collect(),
        }
    }

    /// Substitutes every placeholder. All arguments are required.
    pub fn render(&self, args: &Map<String, Value>) -> Result<PromptsGetResult, McpError> {
        let mut values = HashMap::with_capacity(self.arguments.len());
        for name in &self.arguments {
            let value = match args.get(name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => {
                    return Err(McpError::InvalidParams(format!(
                        "Missing required argument: {}",
                        name
                    )))
                }
                Some(other) => other.to_string(),
            };
            values.insert(name.as_str(), value);
        }

        let fill = |text: &str| -> String {
            PLACEHOLDER
                .replace_all(text, |caps: &regex::Captures| {
                    values.get(&caps[1]).cloned().unwrap_or_default()
                })
                .into_owned()
        };

        let system = self.system_prompt.as_deref().map(|text| PromptMessage {
            role: PromptRole::Assistant,
            content: ToolResultContent::Text { text: fill(text) },
        });
        let messages = system
            .into_iter()
            .chain(self.messages.iter().map(|message| PromptMessage {
                role: message.role,
                content: ToolResultContent::Text {
                    text: fill(&message.text),
                },
            }))
            .collect();

        Ok(PromptsGetResult {
            description: self.description.clone(),
            messages,
        })
    }
}

/// Placeholder names found in `text`, duplicates included.
pub fn placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// The prompts available to one request.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    prompts: Vec<PromptDefinition>,
}

impl PromptRegistry {
    /// Compiles prompts from raw collection records, skipping the ones
    /// that cannot be parsed.
    pub fn from_records(records: Vec<Value>) -> Self {
        let mut prompts: Vec<PromptDefinition> = Vec::with_capacity(records.len());
        for record in records {
            let parsed = serde_json::from_value::<PromptRecord>(record)
                .map_err(|e| e.to_string())
                .and_then(PromptDefinition::from_record);
            match parsed {
                Ok(prompt) if prompts.iter().any(|p| p.name == prompt.name) => {
                    warn!("Skipping duplicate prompt {}", prompt.name);
                }
                Ok(prompt) => prompts.push(prompt),
                Err(e) => warn!("Skipping malformed prompt: {}", e),
            }
        }
        Self { prompts }
    }

    /// Loads the prompts visible to the session. Never fails: a disabled
    /// feature, a missing collection or a failed fetch all give an empty
    /// registry.
    pub async fn fetch(
        session: &dyn BackendSession,
        settings: &PromptSettings,
        schema: &Schema,
    ) -> Self {
        if !settings.enabled {
            return Self::default();
        }
        if !schema.has_collection(&settings.collection) {
            debug!(
                "Prompts collection {} not in schema, no prompts",
                settings.collection
            );
            return Self::default();
        }

        let request = BackendRequest::get(format!("/items/{}", settings.collection))
            .query("fields", PROMPT_FIELDS)
            .query("limit", "-1");

        match session.request(request).await {
            Ok(Value::Array(records)) => Self::from_records(records),
            Ok(other) => {
                warn!(
                    "Unexpected prompts payload from {}: {}",
                    settings.collection, other
                );
                Self::default()
            }
            Err(e) => {
                warn!("Failed to fetch prompts from {}: {}", settings.collection, e);
                Self::default()
            }
        }
    }

    pub fn list(&self) -> Vec<PromptSummary> {
        self.prompts.iter().map(PromptDefinition::summary).collect()
    }

    pub fn find(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.iter().find(|p| p.name == name)
    }

    pub fn get(
        &self,
        name: &str,
        args: Option<&Map<String, Value>>,
    ) -> Result<PromptsGetResult, McpError> {
        let prompt = self
            .find(name)
            .ok_or_else(|| McpError::InvalidParams(format!("Unknown prompt: {}", name)))?;
        let empty = Map::new();
        prompt.render(args.unwrap_or(&empty))
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
