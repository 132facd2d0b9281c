//! OAuth 2.0 endpoint handlers.
//!
//! Implements:
//! - RFC 8414: Authorization Server Metadata pointing at the provider
//! - The gateway's own authorization-code client (start and callback)
//! - Refresh, userinfo and introspection proxies to the provider

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, RawQuery, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::middleware::bearer_token;
use crate::error::GatewayError;
use crate::server::transport::AppState;

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
///
/// Describes the provider endpoints as seen through this gateway's public host.
pub async fn handle_discovery(headers: HeaderMap) -> impl IntoResponse {
    let base_url = public_base_url(&headers);

    Json(serde_json::json!({
        "issuer": base_url,
        "authorization_endpoint": format!("{base_url}/oauth2/auth"),
        "token_endpoint": format!("{base_url}/oauth2/token"),
        "registration_endpoint": format!("{base_url}/oauth/register"),
        "userinfo_endpoint": format!("{base_url}/oauth2/userinfo"),
        "introspection_endpoint": format!("{base_url}/oauth2/introspect"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post"],
        "scopes_supported": ["openid", "offline_access", "email", "profile"],
        "subject_types_supported": ["public"]
    }))
}

/// Base URL clients reach us on, honoring reverse-proxy headers.
fn public_base_url(headers: &HeaderMap) -> String {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let scheme = header_str("x-forwarded-proto").unwrap_or("http");
    let host = header_str("x-forwarded-host")
        .or_else(|| header_str(header::HOST.as_str()))
        .unwrap_or("localhost");

    format!("{scheme}://{host}")
}

/// `GET /oauth/authorize`
///
/// Clients that cached the old authorize endpoint are sent to the provider's,
/// on the same host, with the query string untouched.
pub async fn handle_legacy_authorize(headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let location = format!("https://{host}/oauth2/auth?{}", query.unwrap_or_default());
    redirect(&location)
}

// ─── Authorization-code client ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// `GET /oauth/start`
///
/// Issue a CSRF state and send the browser to the provider.
pub async fn handle_start(State(state): State<Arc<AppState>>) -> Result<Response, GatewayError> {
    let csrf_state = state.csrf.issue().await;
    let url = state.provider.authorization_url(&csrf_state)?;

    tracing::info!(provider = %state.provider.provider_url(), "Redirecting to provider");
    Ok(redirect(url.as_str()))
}

/// `GET /oauth/callback`
///
/// Consume the CSRF state and exchange the code for tokens.
pub async fn handle_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, GatewayError> {
    if let Some(error) = query.error.filter(|e| !e.is_empty()) {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or(""),
            "Provider returned an authorization error"
        );
        return Err(GatewayError::invalid_request(format!("OAuth authorization failed: {error}")));
    }

    let csrf_state = query.state.unwrap_or_default();
    if !state.csrf.consume(&csrf_state).await {
        tracing::warn!("Invalid state parameter");
        return Err(GatewayError::invalid_request("Invalid state parameter"));
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Err(GatewayError::invalid_request("Missing code parameter"));
    };

    let tokens = state.provider.exchange_code(&code).await?;
    tracing::info!("Authorization code exchanged");

    Ok(Json(serde_json::json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token.unwrap_or_default(),
        "token_type": tokens.token_type,
        "expires_in": tokens.expires_in,
        "message": "Authentication successful! Use the access_token for API requests."
    }))
    .into_response())
}

// ─── Provider proxies ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    grant_type: Option<String>,
    refresh_token: Option<String>,
}

/// `POST /oauth/token`
///
/// Only the refresh grant is proxied; codes are exchanged at the provider.
pub async fn handle_token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TokenForm>,
) -> Result<Response, GatewayError> {
    match form.grant_type.as_deref() {
        Some("refresh_token") => {
            let Some(refresh_token) = form.refresh_token.filter(|t| !t.is_empty()) else {
                return Err(GatewayError::invalid_request("refresh_token is required"));
            };

            match state.provider.refresh(&refresh_token).await {
                Ok(tokens) => Ok(Json(tokens).into_response()),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to refresh token");
                    Err(GatewayError::unauthorized("Failed to refresh token"))
                }
            }
        }
        _ => Err(GatewayError::bad_request("unsupported_grant_type", "Unsupported grant_type")),
    }
}

/// `GET /oauth/userinfo`
pub async fn handle_userinfo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let Some(token) = bearer_token(&headers) else {
        return Err(GatewayError::unauthorized("Authorization header required"));
    };

    match state.provider.user_info(&token).await {
        Ok(info) => Ok(Json(info).into_response()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to get user info");
            Err(GatewayError::unauthorized("Failed to get user info"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IntrospectForm {
    token: Option<String>,
}

/// `POST /oauth/introspect`
///
/// Fails closed: any provider failure is reported as `{"active": false}`.
pub async fn handle_introspect(
    State(state): State<Arc<AppState>>,
    Form(form): Form<IntrospectForm>,
) -> Result<Response, GatewayError> {
    let Some(token) = form.token.filter(|t| !t.is_empty()) else {
        return Err(GatewayError::invalid_request("token is required"));
    };

    Ok(Json(state.provider.validate_token(&token).await).into_response())
}

/// 302 Found to `location`.
fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => GatewayError::invalid_request("Invalid redirect target").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_base_url_prefers_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));
        assert_eq!(public_base_url(&headers), "http://internal:8080");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert(
            "x-forwarded-host",
            HeaderValue::from_static("mcp.example.com"),
        );
        assert_eq!(public_base_url(&headers), "https://mcp.example.com");
    }

    #[test]
    fn test_public_base_url_without_host() {
        assert_eq!(public_base_url(&HeaderMap::new()), "http://localhost");
    }

    #[test]
    fn test_redirect_is_302() {
        let response = redirect("https://auth.example.com/oauth2/auth?x=1");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://auth.example.com/oauth2/auth?x=1"
        );
    }
}
