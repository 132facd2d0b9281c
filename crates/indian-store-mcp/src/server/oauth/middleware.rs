//! Bearer-token auth middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use super::types::Identity;
use crate::error::GatewayError;
use crate::server::transport::AppState;

/// Description returned for every rejected token, whatever the cause.
const INVALID_TOKEN: &str = "Token expired or invalid";

/// Extract a non-empty bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string())
        .filter(|token| !token.is_empty())
}

/// Require an active bearer token, attaching the caller's [`Identity`].
///
/// Inactive tokens and failed introspection produce the same 401 response.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        tracing::debug!(path = %req.uri().path(), "Rejected missing bearer token");
        return GatewayError::unauthorized("Missing or malformed bearer token").into_response();
    };

    let introspection = state.provider.validate_token(&token).await;
    if !introspection.active {
        tracing::debug!(path = %req.uri().path(), "Rejected inactive token");
        return GatewayError::unauthorized(INVALID_TOKEN).into_response();
    }

    let identity = Identity {
        subject: introspection.sub.unwrap_or_default(),
        email: introspection.email,
        scope: introspection.scope,
    };
    tracing::debug!(subject = %identity.subject, "Authenticated request");
    req.extensions_mut().insert(identity);

    next.run(req).await
}
