//! Gateway server.
//!
//! A single HTTP listener serves the bearer-protected MCP endpoint next to the
//! OAuth endpoints that delegate identity to the provider.

pub mod dispatcher;
pub mod oauth;
pub mod session;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use transport::AppState;

/// HTTP gateway in front of the MCP tools.
pub struct GatewayServer {
    state: Arc<AppState>,
}

impl GatewayServer {
    /// Build the server with in-memory stores.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the provider client or user store cannot be built.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Ok(Self {
            state: AppState::in_memory(config)?,
        })
    }

    /// Serve until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound or the server fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.state.config.bind_addr();
        tracing::info!(
            provider = %self.state.config.provider_url,
            tools = self.state.dispatcher.tool_count(),
            "Starting gateway"
        );

        let router = transport::create_router(self.state);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("state", &self.state)
            .finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
