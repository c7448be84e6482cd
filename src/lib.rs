//! Directus MCP Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod backend;
pub mod config;
pub mod mcp;
pub mod server;

// Re-export commonly used types for convenience
pub use backend::{BackendConnector, BackendSession, DirectusConnector};
pub use config::{AppConfig, CliConfig, FileConfig, RequestConfig};
pub use server::{make_app, run_server, RequestsLoggingLevel};
