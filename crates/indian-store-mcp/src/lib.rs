//! Indian Store MCP Server
//!
//! A Model Context Protocol (MCP) server that delegates identity to an Ory
//! Hydra provider. The gateway serves the provider's login and consent UI,
//! brokers dynamic client registration, and admits MCP calls only for bearer
//! tokens the provider reports as active.
//!
//! # Features
//!
//! - **Streamable HTTP**: JSON-RPC over a single `POST /mcp` endpoint
//! - **OAuth delegation**: discovery, registration, login and consent backed by Hydra
//! - **Fail-closed auth**: any introspection failure rejects the request
//! - **Per-session init**: tool calls require `initialize` on the same MCP session
//!
//! # Example
//!
//! ```no_run
//! use indian_store_mcp::{config::Config, server::GatewayServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     GatewayServer::new(config)?.run().await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod tools;
pub mod users;

pub use client::ProviderClient;
pub use config::Config;
pub use error::{ConfigError, GatewayError, ProviderError, ToolError, UserStoreError};
