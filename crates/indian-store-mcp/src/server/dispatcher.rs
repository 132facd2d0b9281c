//! MCP JSON-RPC dispatcher.
//!
//! Maps `initialize`, `tools/list`, `tools/call` and `ping` to behavior. Tool
//! methods are gated on the calling MCP session having completed `initialize`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

use super::session::SessionManager;
use super::transport::{JsonRpcRequest, JsonRpcResponse, McpToolInfo};
use crate::server::oauth::Identity;
use crate::tools::{McpTool, ToolContext};

/// Protocol version announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name announced in `initialize` and `/health`.
pub const SERVER_NAME: &str = "indian-store-mcp-server";

/// JSON-RPC error codes.
pub mod codes {
    /// Body is not a JSON-RPC request.
    pub const PARSE_ERROR: i32 = -32700;
    /// Unknown method or unknown tool.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Missing or malformed params, including arguments a tool rejects.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Tool method called before `initialize`.
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
}

/// Per-request inputs the dispatcher needs besides the JSON-RPC body.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Value of the `Mcp-Session-Id` header, if sent.
    pub session_id: Option<String>,
    /// Caller authenticated by the auth middleware.
    pub identity: Option<Identity>,
}

impl RequestContext {
    /// Session key used when the client sends no `Mcp-Session-Id`.
    #[must_use]
    pub fn fallback_key(&self) -> String {
        self.identity.as_ref().map_or_else(
            || "anonymous".to_string(),
            |identity| format!("sub:{}", identity.subject),
        )
    }

    /// Session key for initialization checks.
    #[must_use]
    pub fn session_key(&self) -> String {
        self.session_id
            .clone()
            .unwrap_or_else(|| self.fallback_key())
    }
}

/// Result of dispatching one request.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Response body; `None` for notifications.
    pub response: Option<JsonRpcResponse>,
    /// Session id to return in `Mcp-Session-Id`.
    pub session_id: Option<String>,
}

impl DispatchOutcome {
    fn reply(response: JsonRpcResponse) -> Self {
        Self {
            response: Some(response),
            session_id: None,
        }
    }
}

/// Lenient view of `initialize` params; every field may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
    #[serde(default)]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// MCP protocol state machine.
pub struct McpDispatcher {
    tools: Vec<Box<dyn McpTool>>,
    sessions: Arc<SessionManager>,
}

impl McpDispatcher {
    #[must_use]
    pub fn new(tools: Vec<Box<dyn McpTool>>, sessions: Arc<SessionManager>) -> Self {
        Self { tools, sessions }
    }

    /// Session registry backing initialization state.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Number of registered tools.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Parse a request body, producing the `-32700` response on failure.
    pub fn parse(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
        serde_json::from_slice(body).map_err(|e| {
            tracing::warn!(error = %e, "Invalid JSON-RPC request");
            JsonRpcResponse::error(
                Some(Value::Null),
                codes::PARSE_ERROR,
                "Parse error: Invalid JSON",
            )
        })
    }

    /// Dispatch a parsed request.
    pub async fn dispatch(&self, ctx: &RequestContext, req: JsonRpcRequest) -> DispatchOutcome {
        tracing::debug!(method = %req.method, id = ?req.id, "Handling MCP request");

        if req.method.starts_with("notifications/") {
            tracing::debug!(method = %req.method, "Notification received");
            if req.id.is_none() {
                return DispatchOutcome {
                    response: None,
                    session_id: None,
                };
            }
            return DispatchOutcome::reply(JsonRpcResponse::success(req.id, json!({})));
        }

        match req.method.as_str() {
            "initialize" => self.handle_initialize(ctx, req).await,
            "ping" => DispatchOutcome::reply(JsonRpcResponse::success(req.id, json!({}))),
            "tools/list" | "tools/call" => {
                if !self.sessions.is_initialized(&ctx.session_key()).await {
                    return DispatchOutcome::reply(JsonRpcResponse::error(
                        req.id,
                        codes::SERVER_NOT_INITIALIZED,
                        "Server not initialized",
                    ));
                }
                let response = if req.method == "tools/list" {
                    self.handle_tools_list(req.id)
                } else {
                    self.handle_tools_call(ctx, req.id, req.params).await
                };
                DispatchOutcome::reply(response)
            }
            _ => DispatchOutcome::reply(JsonRpcResponse::error_with_data(
                req.id,
                codes::METHOD_NOT_FOUND,
                "Method not found",
                Value::String(req.method),
            )),
        }
    }

    async fn handle_initialize(
        &self,
        ctx: &RequestContext,
        req: JsonRpcRequest,
    ) -> DispatchOutcome {
        let params: InitializeParams = serde_json::from_value(req.params).unwrap_or_default();
        let client = params.client_info.unwrap_or_default();
        tracing::info!(
            client_name = %client.name,
            client_version = %client.version,
            requested_version = params.protocol_version.as_deref().unwrap_or("unspecified"),
            "MCP initialize"
        );

        let session_id = ctx
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.sessions.mark_initialized(&session_id).await;
        self.sessions.mark_initialized(&ctx.fallback_key()).await;

        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        DispatchOutcome {
            response: Some(JsonRpcResponse::success(req.id, result)),
            session_id: Some(session_id),
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tool_list: Vec<McpToolInfo> = self
            .tools
            .iter()
            .map(|t| McpToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();

        JsonRpcResponse::success(id, json!({ "tools": tool_list }))
    }

    async fn handle_tools_call(
        &self,
        ctx: &RequestContext,
        id: Option<Value>,
        params: Value,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error_with_data(
                    id,
                    codes::INVALID_PARAMS,
                    "Invalid params",
                    Value::String(e.to_string()),
                );
            }
        };

        let Some(tool) = self.tools.iter().find(|t| t.name() == params.name) else {
            return JsonRpcResponse::error_with_data(
                id,
                codes::METHOD_NOT_FOUND,
                "Unknown tool",
                Value::String(params.name),
            );
        };

        tracing::info!(tool = %params.name, "Executing tool");

        let tool_ctx = ToolContext::new(ctx.identity.clone());
        match tool.execute(&tool_ctx, params.arguments).await {
            Ok(text) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [{
                        "type": "text",
                        "text": text
                    }]
                }),
            ),
            Err(e) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool rejected arguments");
                JsonRpcResponse::error(id, codes::INVALID_PARAMS, e.to_user_message())
            }
        }
    }
}

impl std::fmt::Debug for McpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpDispatcher")
            .field("tools", &self.tools.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::register_all_tools;

    fn dispatcher() -> McpDispatcher {
        McpDispatcher::new(register_all_tools(), Arc::new(SessionManager::new()))
    }

    fn request(method: &str, id: Option<Value>, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }

    fn ctx(session_id: Option<&str>) -> RequestContext {
        RequestContext {
            session_id: session_id.map(str::to_string),
            identity: Some(Identity {
                subject: "admin@indian-store.com".to_string(),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_tools_gated_until_initialize() {
        let d = dispatcher();
        let list = request("tools/list", Some(json!(1)), Value::Null);
        let outcome = d.dispatch(&ctx(Some("s1")), list).await;
        let error = outcome.response.unwrap().error.unwrap();
        assert_eq!(error.code, codes::SERVER_NOT_INITIALIZED);
        assert_eq!(error.message, "Server not initialized");
    }

    #[tokio::test]
    async fn test_initialize_returns_session_and_unlocks_tools() {
        let d = dispatcher();
        let init = request("initialize", Some(json!(1)), json!({}));
        let init = d.dispatch(&ctx(None), init).await;
        let session_id = init.session_id.unwrap();
        let result = init.response.unwrap().result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);

        let list = request("tools/list", Some(json!(2)), Value::Null);
        let list = d.dispatch(&ctx(Some(&session_id)), list).await;
        let tools = list.response.unwrap().result.unwrap();
        assert_eq!(tools["tools"][0]["name"], "list_indian_stores");

        // Same subject without the header uses the fallback key
        let list = request("tools/list", Some(json!(3)), Value::Null);
        let list = d.dispatch(&ctx(None), list).await;
        assert!(list.response.unwrap().error.is_none());
    }

    #[tokio::test]
    async fn test_initialization_does_not_leak_across_sessions() {
        let d = dispatcher();
        let init = request("initialize", Some(json!(1)), json!({}));
        d.dispatch(&ctx(Some("s1")), init).await;

        let list = request("tools/list", Some(json!(2)), Value::Null);
        let other = d.dispatch(&ctx(Some("s2")), list).await;
        let error = other.response.unwrap().error.unwrap();
        assert_eq!(error.code, codes::SERVER_NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let d = dispatcher();
        let note = request("notifications/initialized", None, Value::Null);
        let outcome = d.dispatch(&ctx(None), note).await;
        assert!(outcome.response.is_none());
    }

    #[tokio::test]
    async fn test_ping_before_initialize() {
        let d = dispatcher();
        let ping = request("ping", Some(json!("p")), Value::Null);
        let outcome = d.dispatch(&ctx(None), ping).await;
        let response = outcome.response.unwrap();
        assert_eq!(response.result.unwrap(), json!({}));
        assert_eq!(response.id, Some(json!("p")));
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let d = dispatcher();
        let unknown = request("resources/list", Some(json!(1)), Value::Null);
        let outcome = d.dispatch(&ctx(Some("s")), unknown).await;
        let error = outcome.response.unwrap().error.unwrap();
        assert_eq!(error.code, codes::METHOD_NOT_FOUND);
        assert_eq!(error.data, Some(json!("resources/list")));

        let init = request("initialize", Some(json!(2)), json!({}));
        d.dispatch(&ctx(Some("s")), init).await;
        let call = request("tools/call", Some(json!(3)), json!({"name": "nope"}));
        let outcome = d.dispatch(&ctx(Some("s")), call).await;
        let error = outcome.response.unwrap().error.unwrap();
        assert_eq!(error.code, codes::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Unknown tool");
        assert_eq!(error.data, Some(json!("nope")));
    }

    #[tokio::test]
    async fn test_tools_call_invalid_params() {
        let d = dispatcher();
        let init = request("initialize", Some(json!(1)), json!({}));
        d.dispatch(&ctx(Some("s")), init).await;
        let call = request("tools/call", Some(json!(2)), json!({}));
        let outcome = d.dispatch(&ctx(Some("s")), call).await;
        let error = outcome.response.unwrap().error.unwrap();
        assert_eq!(error.code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_validation_error_maps_to_invalid_params() {
        let d = dispatcher();
        let init = request("initialize", Some(json!(1)), json!({}));
        d.dispatch(&ctx(Some("s")), init).await;

        let params = json!({"name": "list_indian_stores", "arguments": "all"});
        let call = request("tools/call", Some(json!(2)), params);
        let outcome = d.dispatch(&ctx(Some("s")), call).await;
        let error = outcome.response.unwrap().error.unwrap();
        assert_eq!(error.code, codes::INVALID_PARAMS);
        assert_eq!(
            error.message,
            "Invalid input for 'arguments': must be an object"
        );
        assert!(error.data.is_none());
    }

    #[test]
    fn test_parse_error() {
        let response = McpDispatcher::parse(b"{not json").unwrap_err();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["code"], codes::PARSE_ERROR);
        assert!(json["id"].is_null());
        assert!(json.as_object().unwrap().contains_key("id"));
    }
}
