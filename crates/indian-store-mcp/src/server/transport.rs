//! HTTP transport.
//!
//! JSON-RPC envelope types, shared handler state and the router that wires the
//! MCP endpoint, the OAuth delegation endpoints and the browser login flow.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::dispatcher::{McpDispatcher, RequestContext, SERVER_NAME};
use super::oauth::{
    CsrfStore, Identity, InMemoryCsrfStore, InMemorySessionStore, SessionStore, handlers, login,
    middleware::require_auth, registration,
};
use super::session::SessionManager;
use crate::client::ProviderClient;
use crate::config::Config;
use crate::tools::register_all_tools;
use crate::users::{InMemoryUserStore, UserStore};

/// Header carrying the MCP session id.
pub const MCP_SESSION_HEADER: &str = "Mcp-Session-Id";

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// JSON-RPC version constant.
    const VERSION: &'static str = "2.0";

    #[must_use]
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: Some(result),
            error: None,
            id,
        }
    }

    #[must_use]
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    #[must_use]
    pub fn error_with_data(
        id: Option<serde_json::Value>,
        code: i32,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        let mut response = Self::error(id, code, message);
        if let Some(ref mut error) = response.error {
            error.data = Some(data);
        }
        response
    }
}

/// MCP tool info for tools/list response.
#[derive(Debug, Serialize)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Shared state for HTTP handlers.
pub struct AppState {
    pub config: Config,
    pub provider: ProviderClient,
    pub csrf: Arc<dyn CsrfStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserStore>,
    pub dispatcher: McpDispatcher,
}

impl AppState {
    /// Assemble state from explicit stores.
    #[must_use]
    pub fn new(
        config: Config,
        provider: ProviderClient,
        csrf: Arc<dyn CsrfStore>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let mcp_sessions = Arc::new(SessionManager::new());
        Arc::clone(&mcp_sessions).start_cleanup_task();

        Self {
            config,
            provider,
            csrf,
            sessions,
            users,
            dispatcher: McpDispatcher::new(register_all_tools(), mcp_sessions),
        }
    }

    /// Build state backed by in-memory stores with their cleanup tasks running.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the provider client cannot be built or the default
    /// admin password cannot be hashed.
    pub fn in_memory(config: Config) -> anyhow::Result<Arc<Self>> {
        let provider = ProviderClient::new(&config)?;

        let csrf = Arc::new(InMemoryCsrfStore::with_ttl(config.state_ttl));
        Arc::clone(&csrf).start_cleanup_task();

        let sessions = Arc::new(InMemorySessionStore::new());
        Arc::clone(&sessions).start_cleanup_task();

        let users = Arc::new(InMemoryUserStore::with_default_admin()?);

        Ok(Arc::new(Self::new(config, provider, csrf, sessions, users)))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("provider", &self.provider)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Create the gateway router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth = middleware::from_fn_with_state(Arc::clone(&state), require_auth);

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // OAuth discovery and registration
        .route(
            "/.well-known/oauth-authorization-server",
            get(handlers::handle_discovery),
        )
        .route("/oauth/register", post(registration::handle_register))
        .route("/oauth/authorize", get(handlers::handle_legacy_authorize))
        // Gateway's own authorization-code client
        .route("/oauth/start", get(handlers::handle_start))
        .route("/oauth/callback", get(handlers::handle_callback))
        .route("/oauth/token", post(handlers::handle_token))
        .route("/oauth/userinfo", get(handlers::handle_userinfo))
        .route("/oauth/introspect", post(handlers::handle_introspect))
        // Provider login/consent and error fallback pages
        .route(
            "/login",
            get(login::handle_login).post(login::handle_login_submit),
        )
        .route("/consent", get(login::handle_consent))
        .route("/oauth2/fallbacks/error", get(login::handle_error))
        // Streamable HTTP transport - single endpoint, bearer protected
        .route("/mcp", post(handle_mcp).route_layer(auth))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "server": SERVER_NAME
    }))
}

/// Handle POST requests to /mcp.
///
/// Always answers 200 with a JSON-RPC body, except 202 for notifications.
async fn handle_mcp(
    State(state): State<Arc<AppState>>,
    identity: Option<Extension<Identity>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = match McpDispatcher::parse(&body) {
        Ok(req) => req,
        Err(parse_error) => return Json(parse_error).into_response(),
    };

    let ctx = RequestContext {
        session_id: headers
            .get(MCP_SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        identity: identity.map(|Extension(identity)| identity),
    };

    let outcome = state.dispatcher.dispatch(&ctx, req).await;

    let mut response = match outcome.response {
        Some(body) => Json(body).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    if let Some(session_id) = outcome.session_id {
        if let Ok(value) = HeaderValue::from_str(&session_id) {
            response.headers_mut().insert(MCP_SESSION_HEADER, value);
        }
    }
    response
}
