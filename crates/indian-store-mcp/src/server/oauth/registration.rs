//! RFC 7591 dynamic client registration, forwarded to the provider admin API.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::models::{RegistrationRequest, RegistrationResponse};
use crate::server::transport::AppState;

/// `POST /oauth/register`
///
/// Register a new OAuth client with the provider.
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request: RegistrationRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to decode registration request");
        GatewayError::invalid_request("Invalid JSON in request body")
    })?;

    if request.redirect_uris.is_empty() {
        return Err(GatewayError::bad_request(
            "invalid_redirect_uri",
            "At least one redirect_uri is required",
        ));
    }

    let normalized = request.normalize();
    let created = state.provider.create_client(&normalized).await?;

    let response = RegistrationResponse::new(created.client_id, created.client_secret, normalized);
    tracing::info!(
        client_id = %response.client_id,
        client_name = response.client_name.as_deref().unwrap_or(""),
        "Registered OAuth client"
    );

    Ok((StatusCode::CREATED, Json(response)).into_response())
}
