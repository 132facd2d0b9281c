//! Fuzzing library for indian-store-mcp.
//!
//! This crate provides fuzzing targets for the JSON the gateway accepts from
//! MCP clients and from the identity provider.
//!
//! # Usage
//!
//! ```bash
//! cd crates/gateway-fuzz
//! cargo +nightly fuzz run fuzz_jsonrpc_parse -- -max_total_time=60
//! ```

pub use indian_store_mcp::models;
pub use indian_store_mcp::server::dispatcher::McpDispatcher;
