//! MCP (Model Context Protocol) Server
//!
//! Exposes the content backend to LLM clients as tools and prompts.
//!
//! ## Architecture
//!
//! - Transport: stateless streamable HTTP, `POST /mcp`
//! - Auth: the caller's backend token (`access_token` query or bearer header)
//! - Lifecycle: one [`McpBundle`] per HTTP request, torn down when the
//!   request ends

pub mod bundle;
pub mod context;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;

pub use bundle::{bootstrap_error_response, BootstrapError, McpBundle};
pub use protocol::{McpError, McpRequest, McpResponse};
pub use registry::ToolRegistry;
pub use server::{McpServer, ServerPhase};
pub use transport::StatelessTransport;
