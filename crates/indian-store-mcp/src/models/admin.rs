//! Hydra admin API payloads (login/consent acceptance and client creation).

use serde::{Deserialize, Serialize};

/// How long the provider should remember a login or consent decision, in seconds.
pub const REMEMBER_FOR_SECS: u64 = 86_400;

/// Body of `PUT /admin/oauth2/auth/requests/login/accept`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginAcceptRequest {
    pub subject: String,
    pub remember: bool,
    pub remember_for: u64,
}

impl LoginAcceptRequest {
    /// Accept the login for `subject`, remembered for 24 hours.
    #[must_use]
    pub fn remembered(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            remember: true,
            remember_for: REMEMBER_FOR_SECS,
        }
    }
}

/// Response of the login and consent accept calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectResponse {
    /// Where the browser must go next.
    pub redirect_to: String,
}

/// Response of `GET /admin/oauth2/auth/requests/consent`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsentRequest {
    #[serde(default)]
    pub requested_scope: Vec<String>,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub client: ConsentClient,
}

/// Client summary embedded in a consent request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsentClient {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_name: Option<String>,
}

/// Body of `PUT /admin/oauth2/auth/requests/consent/accept`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentAcceptRequest {
    pub grant_scope: Vec<String>,
    pub grant_access_token_audience: Vec<String>,
    pub remember: bool,
    pub remember_for: u64,
    pub session: ConsentSession,
}

impl ConsentAcceptRequest {
    /// Grant exactly the requested scopes and embed the user's identity in the ID token.
    #[must_use]
    pub fn grant(
        requested_scope: Vec<String>,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            grant_scope: requested_scope,
            grant_access_token_audience: Vec::new(),
            remember: true,
            remember_for: REMEMBER_FOR_SECS,
            session: ConsentSession {
                id_token: IdTokenClaims {
                    email: email.into(),
                    name: name.into(),
                },
            },
        }
    }
}

/// Session data attached to a consent acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentSession {
    pub id_token: IdTokenClaims,
}

/// Extra ID token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdTokenClaims {
    pub email: String,
    pub name: String,
}

/// Body of `POST /admin/clients`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientCreateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub scope: String,
    pub token_endpoint_auth_method: String,
}

/// The fields of the admin client-creation response the gateway uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientCreateResponse {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: Option<String>,
}
