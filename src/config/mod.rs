mod file_config;
pub mod request;

pub use file_config::{FileConfig, PromptsConfig, ToolsConfig};
pub use request::{RequestConfig, RequestInputs};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;

/// Used when neither the CLI, the config file nor the environment name a backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8055";

/// Secondary environment fallback for the backend URL, set by Directus itself.
pub const PUBLIC_URL_ENV: &str = "PUBLIC_URL";

pub const DEFAULT_PROMPTS_COLLECTION: &str = "ai_prompts";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant working against a Directus \
instance through MCP tools. Call `read-collections` before reading or writing items so you \
know which collections and fields exist. Prefer narrow `fields` selections and small \
`limit` values, confirm destructive operations with the user, and report backend errors \
verbatim instead of guessing.";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub base_path: Option<String>,
    pub backend_url: Option<String>,
    pub backend_timeout_sec: u64,
    pub disabled_tools: Vec<String>,
    pub system_prompt_enabled: bool,
    pub prompts_enabled: bool,
    pub prompts_collection: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Mount path of the HTTP surface, empty for the root.
    pub base_path: String,
    pub backend_url: String,
    pub backend_timeout_sec: u64,

    // Feature configs (with defaults)
    pub tools: ToolSettings,
    pub prompts: PromptSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub disabled: Vec<String>,
    pub system_prompt_enabled: bool,
    pub system_prompt: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            system_prompt_enabled: true,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl ToolSettings {
    pub fn is_disabled(&self, tool_name: &str) -> bool {
        self.disabled.iter().any(|name| name == tool_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptSettings {
    pub enabled: bool,
    pub collection: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            collection: DEFAULT_PROMPTS_COLLECTION.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            metrics_port: 9092,
            logging_level: RequestsLoggingLevel::Path,
            base_path: String::new(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_timeout_sec: 30,
            tools: ToolSettings::default(),
            prompts: PromptSettings::default(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        Self::resolve_with_env(cli, file_config, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::resolve`], reading environment fallbacks through `env`.
    pub fn resolve_with_env<F>(
        cli: &CliConfig,
        file_config: Option<FileConfig>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port && port != 0 {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let base_path = normalize_base_path(
            file.base_path
                .as_deref()
                .or(cli.base_path.as_deref())
                .unwrap_or_default(),
        );

        let backend_url = resolve_backend_url(
            file.backend_url.or_else(|| cli.backend_url.clone()),
            env,
        );
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            bail!("backend_url must be an http(s) URL, got {:?}", backend_url);
        }

        let backend_timeout_sec = file.backend_timeout_sec.unwrap_or(cli.backend_timeout_sec);
        if backend_timeout_sec == 0 {
            bail!("backend_timeout_sec must be greater than zero");
        }

        // Tool settings - merge file config with CLI and defaults
        let tools_file = file.tools.unwrap_or_default();
        let tools = ToolSettings {
            disabled: tools_file
                .disabled
                .unwrap_or_else(|| cli.disabled_tools.clone()),
            system_prompt_enabled: tools_file
                .system_prompt_enabled
                .unwrap_or(cli.system_prompt_enabled),
            system_prompt: tools_file
                .system_prompt
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        let prompts_file = file.prompts.unwrap_or_default();
        let prompts = PromptSettings {
            enabled: prompts_file.enabled.unwrap_or(cli.prompts_enabled),
            collection: prompts_file
                .collection
                .or_else(|| cli.prompts_collection.clone())
                .unwrap_or_else(|| DEFAULT_PROMPTS_COLLECTION.to_string()),
        };

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            base_path,
            backend_url,
            backend_timeout_sec,
            tools,
            prompts,
        })
    }
}

/// Picks the explicit URL, then `PUBLIC_URL`, then the fixed default.
/// `DIRECTUS_MCP_URL` reaches this function through clap's env fallback.
fn resolve_backend_url<F>(explicit: Option<String>, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let url = explicit
        .filter(|s| !s.trim().is_empty())
        .or_else(|| env(PUBLIC_URL_ENV).filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
    url.trim().trim_end_matches('/').to_string()
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
