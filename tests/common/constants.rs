//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When fake backend data changes (tokens, collections, prompts),
//! update only this file.

// ============================================================================
// Backend Credentials
// ============================================================================

/// Token of the editor user, who sees `articles` and the prompts collection
pub const EDITOR_TOKEN: &str = "editor-token";

/// Id of the user behind `EDITOR_TOKEN`
pub const EDITOR_ID: &str = "user-editor";

/// Token of the shop user, who only sees `products`
pub const SHOP_TOKEN: &str = "shop-token";

/// Id of the user behind `SHOP_TOKEN`
pub const SHOP_ID: &str = "user-shop";

/// A token the backend rejects
pub const INVALID_TOKEN: &str = "expired-token";

// ============================================================================
// Backend Data
// ============================================================================

pub const ARTICLES: &str = "articles";

pub const PRODUCTS: &str = "products";

pub const PROMPTS_COLLECTION: &str = "ai_prompts";

/// Prompt with `{{ topic }}` and `{{ tone }}` placeholders
pub const PROMPT_WRITE_ARTICLE: &str = "write-article";

/// Prompt without placeholders
pub const PROMPT_GREETING: &str = "greeting";

/// Id of the only file in the fake backend
pub const FILE_1_ID: &str = "file-1";

/// Every tool the server registers, in registration order
pub const ALL_TOOLS: [&str; 9] = [
    "system-prompt",
    "users-me",
    "read-collections",
    "read-items",
    "create-item",
    "update-item",
    "delete-item",
    "read-files",
    "markdown-tool",
];

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// How often to poll while waiting for the server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
