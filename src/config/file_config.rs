use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub base_path: Option<String>,
    pub backend_url: Option<String>,
    pub backend_timeout_sec: Option<u64>,

    // Feature configs
    pub tools: Option<ToolsConfig>,
    pub prompts: Option<PromptsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    /// Names of tools that must never be exposed.
    pub disabled: Option<Vec<String>>,
    pub system_prompt_enabled: Option<bool>,
    /// Replaces the built-in system prompt text.
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PromptsConfig {
    pub enabled: Option<bool>,
    /// Backend collection holding the prompt records.
    pub collection: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
