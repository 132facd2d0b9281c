//! Login and consent orchestration for the provider's browser flow.
//!
//! The provider redirects the browser here with a `login_challenge` or a
//! `consent_challenge`. The gateway authenticates the user (by session cookie
//! or password), accepts the challenge through the admin API and sends the
//! browser to whatever `redirect_to` the provider returns.

use std::sync::Arc;

use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use axum_extra::headers::{Cookie, HeaderMapExt};
use serde::Deserialize;

use super::pages;
use super::types::SESSION_LIFETIME_SECS;
use crate::error::{BrowserError, GatewayError, UserStoreError};
use crate::models::{ConsentAcceptRequest, LoginAcceptRequest};
use crate::server::transport::AppState;

/// Name of the browser session cookie.
pub const SESSION_COOKIE: &str = "session_id";

/// Shown for every failed password login.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    login_challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    login_challenge: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct ConsentQuery {
    consent_challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    error: Option<String>,
    error_description: Option<String>,
}

// ─── Login ───────────────────────────────────────────────────────────────────

/// `GET /login`
///
/// Accept immediately for a valid session cookie, otherwise show the login form.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> Result<Response, BrowserError> {
    let challenge = required_challenge(query.login_challenge, "Missing login_challenge")?;
    tracing::info!(challenge = %challenge, "Login challenge received");

    if let Some(response) = accept_existing_session(&state, &headers, &challenge).await? {
        return Ok(response);
    }

    Ok(Html(pages::login_page(&challenge, None)).into_response())
}

/// `POST /login`
///
/// Authenticate the submitted credentials, start a session and accept the login.
pub async fn handle_login_submit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, BrowserError> {
    let challenge = query.login_challenge.or(form.login_challenge);
    let challenge = required_challenge(challenge, "Missing login_challenge")?;

    if let Some(response) = accept_existing_session(&state, &headers, &challenge).await? {
        return Ok(response);
    }

    let user = match state.users.authenticate(&form.email, &form.password).await {
        Ok(user) => user,
        Err(UserStoreError::InvalidCredentials) => {
            tracing::info!(email = %form.email, "Authentication failed");
            let page = pages::login_page(&challenge, Some(INVALID_CREDENTIALS));
            return Ok(Html(page).into_response());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(email = %user.email, "User authenticated");

    let session = state.sessions.create(&user.email).await;
    let mut response = accept_login(&state, &challenge, &user.email).await?;
    response
        .headers_mut()
        .insert(header::SET_COOKIE, session_cookie(&session.id)?);

    Ok(response)
}

/// Accept the login on behalf of a valid cookie session, if there is one.
async fn accept_existing_session(
    state: &AppState,
    headers: &HeaderMap,
    challenge: &str,
) -> Result<Option<Response>, BrowserError> {
    let Some(session_id) = session_id(headers) else {
        return Ok(None);
    };
    let Some(session) = state.sessions.lookup(&session_id).await else {
        return Ok(None);
    };

    tracing::info!(email = %session.email, "User already logged in, auto-accepting");
    accept_login(state, challenge, &session.email)
        .await
        .map(Some)
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Cookie>()?
        .get(SESSION_COOKIE)
        .map(str::to_string)
}

async fn accept_login(
    state: &AppState,
    challenge: &str,
    subject: &str,
) -> Result<Response, BrowserError> {
    let request = LoginAcceptRequest::remembered(subject);
    let accepted = state.provider.accept_login(challenge, &request).await?;
    tracing::info!(subject, redirect_to = %accepted.redirect_to, "Login accepted");
    found(&accepted.redirect_to)
}

// ─── Consent ─────────────────────────────────────────────────────────────────

/// `GET /consent`
///
/// Grant the requested scopes for the challenge's subject and embed the user's
/// email and name in the ID token.
pub async fn handle_consent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConsentQuery>,
) -> Result<Response, BrowserError> {
    let challenge = required_challenge(query.consent_challenge, "Missing consent_challenge")?;
    tracing::info!(challenge = %challenge, "Consent challenge received");

    let consent = state.provider.consent_request(&challenge).await?;

    let user = match state.users.get_user(&consent.subject).await {
        Ok(user) => user,
        Err(UserStoreError::NotFound(_)) => {
            tracing::warn!(
                subject = %consent.subject,
                client_id = %consent.client.client_id,
                "Consent for unknown user"
            );
            return Err(GatewayError::unauthorized("User not found").into());
        }
        Err(e) => return Err(e.into()),
    };

    let accept = ConsentAcceptRequest::grant(consent.requested_scope, user.email, user.name);
    let accepted = state.provider.accept_consent(&challenge, &accept).await?;
    tracing::info!(
        client_id = %consent.client.client_id,
        redirect_to = %accepted.redirect_to,
        "Consent accepted"
    );

    found(&accepted.redirect_to)
}

// ─── Error fallback ──────────────────────────────────────────────────────────

/// `GET /oauth2/fallbacks/error`
pub async fn handle_error(Query(query): Query<ErrorQuery>) -> Response {
    let error = query.error.unwrap_or_default();
    let description = query
        .error_description
        .filter(|d| !d.is_empty())
        .map(|d| unescape(&d))
        .unwrap_or_else(|| "An OAuth error occurred".to_string());

    tracing::warn!(error = %error, description = %description, "OAuth error");

    (StatusCode::BAD_REQUEST, Html(pages::error_page(&error, &description))).into_response()
}

/// Decode a description that arrives percent-encoded twice; keep it as-is if that fails.
fn unescape(value: &str) -> String {
    urlencoding::decode(&value.replace('+', " "))
        .map_or_else(|_| value.to_string(), |d| d.into_owned())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn required_challenge(challenge: Option<String>, message: &str) -> Result<String, BrowserError> {
    challenge
        .filter(|c| !c.is_empty())
        .ok_or_else(|| GatewayError::invalid_request(message).into())
}

/// 302 to a provider-supplied location.
fn found(location: &str) -> Result<Response, BrowserError> {
    let Ok(value) = HeaderValue::from_str(location) else {
        let message = format!("provider returned an invalid redirect: {location:?}");
        return Err(GatewayError::internal(message).into());
    };
    Ok((StatusCode::FOUND, [(header::LOCATION, value)]).into_response())
}

fn session_cookie(session_id: &str) -> Result<HeaderValue, BrowserError> {
    let cookie = format!(
        "{SESSION_COOKIE}={session_id}; Path=/; Max-Age={SESSION_LIFETIME_SECS}; HttpOnly; Secure; SameSite=Lax"
    );
    HeaderValue::from_str(&cookie).map_err(|e| GatewayError::internal(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc").unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "session_id=abc; Path=/; Max-Age=86400; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn test_found_rejects_invalid_location() {
        assert!(found("https://auth.example.com/oauth2/auth?login_verifier=x").is_ok());
        assert!(found("bad\nlocation").is_err());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("The%20user%20denied"), "The user denied");
        assert_eq!(unescape("plain text"), "plain text");
        assert_eq!(unescape("bad%zz"), "bad%zz");
    }

    #[test]
    fn test_required_challenge() {
        assert!(required_challenge(None, "Missing login_challenge").is_err());
        assert!(required_challenge(Some(String::new()), "Missing login_challenge").is_err());
        assert_eq!(required_challenge(Some("c".to_string()), "m").unwrap(), "c");
    }
}
