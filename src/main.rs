use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use directus_mcp_server::config::{AppConfig, CliConfig, FileConfig};
use directus_mcp_server::mcp::tools::TOOLS;
use directus_mcp_server::server::metrics;
use directus_mcp_server::{run_server, DirectusConnector, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[clap(version)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, env = "DIRECTUS_MCP_CONFIG", value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9092)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path prefix under which all routes are mounted, e.g. `/mcp-server`.
    #[clap(long, env = "DIRECTUS_MCP_BASE_PATH")]
    pub base_path: Option<String>,

    /// Base URL of the Directus instance. Falls back to `PUBLIC_URL`, then
    /// to http://localhost:8055.
    #[clap(long, env = "DIRECTUS_MCP_URL")]
    pub backend_url: Option<String>,

    /// Timeout in seconds for each backend request.
    #[clap(long, default_value_t = 30)]
    pub backend_timeout_sec: u64,

    /// Tools that must not be exposed (repeatable or comma separated).
    #[clap(long = "disable-tool", env = "DIRECTUS_MCP_DISABLED_TOOLS", value_delimiter = ',')]
    pub disabled_tools: Vec<String>,

    /// Hide the `system-prompt` tool.
    #[clap(long)]
    pub no_system_prompt: bool,

    /// Do not load prompts from the backend.
    #[clap(long)]
    pub no_prompts: bool,

    /// Backend collection holding prompt records.
    #[clap(long, env = "DIRECTUS_MCP_PROMPTS_COLLECTION")]
    pub prompts_collection: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            base_path: self.base_path.clone(),
            backend_url: self.backend_url.clone(),
            backend_timeout_sec: self.backend_timeout_sec,
            disabled_tools: self.disabled_tools.clone(),
            system_prompt_enabled: !self.no_system_prompt,
            prompts_enabled: !self.no_prompts,
            prompts_collection: self.prompts_collection.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    info!(
        "Starting Directus MCP Server {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    let enabled_tools = TOOLS.active(&config.tools).len();
    info!(
        "{} of {} tools enabled, prompts {}",
        enabled_tools,
        TOOLS.tool_count(),
        if config.prompts.enabled {
            format!("from collection {}", config.prompts.collection)
        } else {
            "disabled".to_string()
        }
    );

    info!("Backend at {}", config.backend_url);
    info!(
        "Ready to serve at port {}{}!",
        config.port, config.base_path
    );
    info!("Metrics available at port {}!", config.metrics_port);

    run_server(config, Arc::new(DirectusConnector)).await
}
