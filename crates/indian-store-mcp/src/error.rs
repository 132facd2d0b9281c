//! Error types for the Indian Store MCP gateway.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! [`GatewayError`] is the HTTP-facing error: it renders as an OAuth-style JSON body,
//! and [`BrowserError`] wraps it for the HTML login/consent pages.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::server::oauth::pages;

/// Fatal configuration errors, raised before the listener binds.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A mandatory variable is unset or empty
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// A variable is set but does not parse
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Errors from the identity provider client.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// HTTP transport error (connection, DNS, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error (retry layer)
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Provider answered with a non-2xx status
    #[error("provider returned {status}: {body}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Response body did not decode into the expected shape
    #[error("failed to decode provider response: {source}")]
    Decode {
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
        /// Raw response body
        body: String,
    },

    /// Request body could not be serialized
    #[error("failed to encode provider request: {0}")]
    Encode(#[source] serde_json::Error),

    /// A provider URL could not be constructed
    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ProviderError {
    /// Create an upstream status error.
    #[must_use]
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Upstream status code, if the provider answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience alias for provider client results.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from the user credential store.
#[derive(thiserror::Error, Debug)]
pub enum UserStoreError {
    /// Email unknown or password mismatch; deliberately indistinguishable
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A user with this email already exists
    #[error("user already exists: {0}")]
    DuplicateUser(String),

    /// No user with this email
    #[error("user not found: {0}")]
    NotFound(String),

    /// Password hashing failed
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Convert to a user-friendly error message.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        let Self::Validation { field, message } = self;
        format!("Invalid input for '{field}': {message}")
    }
}

/// Convenience alias for tool results.
pub type ToolResult<T> = Result<T, ToolError>;

/// HTTP-facing gateway error.
///
/// Renders as `{"error": ..., "error_description": ...}` with the matching status.
/// Upstream details are logged, never returned to the caller.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    /// Malformed or incomplete request (400)
    #[error("{code}: {description}")]
    BadRequest {
        /// OAuth error code
        code: &'static str,
        /// Human-readable description
        description: String,
    },

    /// Missing or rejected credentials (401)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The identity provider call failed (500)
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// User store failure that is not the caller's fault (500)
    #[error("user store error: {0}")]
    UserStore(#[from] UserStoreError),

    /// Any other server-side failure (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Create an `invalid_request` error.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::BadRequest {
            code: "invalid_request",
            description: description.into(),
        }
    }

    /// Create a 400 error with a specific OAuth error code.
    #[must_use]
    pub fn bad_request(code: &'static str, description: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            description: description.into(),
        }
    }

    /// Create a 401 error.
    #[must_use]
    pub fn unauthorized(description: impl Into<String>) -> Self {
        Self::Unauthorized(description.into())
    }

    /// Create a 500 error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Provider(_) | Self::UserStore(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// OAuth error code and the description safe to show the caller.
    fn public_parts(&self) -> (&'static str, String) {
        match self {
            Self::BadRequest { code, description } => (code, description.clone()),
            Self::Unauthorized(description) => ("invalid_token", description.clone()),
            Self::Provider(_) | Self::UserStore(_) => {
                ("server_error", "Error communicating with the authorization server".to_string())
            }
            Self::Internal(_) => ("server_error", "Internal server error".to_string()),
        }
    }

    fn log(&self) {
        match self {
            Self::Provider(ProviderError::Upstream { status, body }) => {
                tracing::error!(status, body = %body, "Provider request failed");
            }
            Self::Provider(ProviderError::Decode { source, body }) => {
                tracing::error!(error = %source, body = %body, "Provider response did not decode");
            }
            Self::Provider(e) => tracing::error!(error = %e, "Provider request failed"),
            Self::UserStore(e) => tracing::error!(error = %e, "User store failure"),
            Self::Internal(message) => tracing::error!(error = %message, "Internal error"),
            Self::BadRequest { .. } | Self::Unauthorized(_) => {}
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let (code, description) = self.public_parts();
        let body = Json(serde_json::json!({
            "error": code,
            "error_description": description,
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Gateway error rendered as an HTML page for browser flows.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct BrowserError(#[from] pub GatewayError);

impl From<ProviderError> for BrowserError {
    fn from(err: ProviderError) -> Self {
        Self(GatewayError::Provider(err))
    }
}

impl From<UserStoreError> for BrowserError {
    fn from(err: UserStoreError) -> Self {
        Self(GatewayError::UserStore(err))
    }
}

impl IntoResponse for BrowserError {
    fn into_response(self) -> Response {
        self.0.log();
        let status = self.0.status();
        let (code, description) = self.0.public_parts();
        (status, Html(pages::error_page(code, &description))).into_response()
    }
}
