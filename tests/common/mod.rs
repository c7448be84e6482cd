//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, EDITOR_TOKEN};
//!
//! #[tokio::test]
//! async fn test_list_tools() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::with_token(server.base_url.clone(), EDITOR_TOKEN);
//!
//!     let tools = client.list_tools().await;
//!     assert!(tools.contains(&"read-items".to_string()));
//! }
//! ```

mod backend;
mod client;
mod constants;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::{tool_json, tool_text, TestClient};
pub use constants::*;
pub use server::TestServer;
