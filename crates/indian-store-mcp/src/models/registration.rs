//! RFC 7591 dynamic client registration request and response.

use serde::{Deserialize, Deserializer, Serialize};

use super::ClientCreateRequest;

/// Scope granted to dynamically registered clients when none is requested.
pub const DEFAULT_SCOPE: &str = "openid offline_access email profile";

/// Token endpoint auth method used when none is requested.
pub const DEFAULT_AUTH_METHOD: &str = "client_secret_basic";

/// Incoming registration request. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub client_name: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub redirect_uris: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub grant_types: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub response_types: Vec<String>,

    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,
}

/// Clients send `null` for lists they leave unset; treat it like an absent field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RegistrationRequest {
    /// Fill unset fields with the gateway defaults.
    #[must_use]
    pub fn normalize(self) -> ClientCreateRequest {
        let grant_types = if self.grant_types.is_empty() {
            vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ]
        } else {
            self.grant_types
        };
        let response_types = if self.response_types.is_empty() {
            vec!["code".to_string()]
        } else {
            self.response_types
        };

        ClientCreateRequest {
            client_name: self.client_name.filter(|n| !n.is_empty()),
            redirect_uris: self.redirect_uris,
            grant_types,
            response_types,
            scope: self
                .scope
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            token_endpoint_auth_method: self
                .token_endpoint_auth_method
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_AUTH_METHOD.to_string()),
        }
    }
}

/// RFC 7591 registration response.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResponse {
    pub client_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub scope: String,
    pub token_endpoint_auth_method: String,

    /// Always emitted; `0` means the secret never expires.
    pub client_secret_expires_at: i64,
}

impl RegistrationResponse {
    /// Combine the provider's credentials with the normalized request.
    #[must_use]
    pub fn new(
        client_id: String,
        client_secret: Option<String>,
        request: ClientCreateRequest,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            client_name: request.client_name,
            redirect_uris: request.redirect_uris,
            grant_types: request.grant_types,
            response_types: request.response_types,
            scope: request.scope,
            token_endpoint_auth_method: request.token_endpoint_auth_method,
            client_secret_expires_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_applies_defaults() {
        let req: RegistrationRequest =
            serde_json::from_str(r#"{"redirect_uris":["https://app.example.com/cb"]}"#).unwrap();
        let normalized = req.normalize();

        assert_eq!(
            normalized.grant_types,
            vec!["authorization_code", "refresh_token"]
        );
        assert_eq!(normalized.response_types, vec!["code"]);
        assert_eq!(normalized.scope, DEFAULT_SCOPE);
        assert_eq!(normalized.token_endpoint_auth_method, "client_secret_basic");
        assert!(normalized.client_name.is_none());
    }

    #[test]
    fn test_normalize_keeps_explicit_values() {
        let req: RegistrationRequest = serde_json::from_str(
            r#"{"client_name":"Cursor","redirect_uris":["x"],"grant_types":["authorization_code"],
                "scope":"openid","token_endpoint_auth_method":"client_secret_post"}"#,
        )
        .unwrap();
        let normalized = req.normalize();

        assert_eq!(normalized.client_name.as_deref(), Some("Cursor"));
        assert_eq!(normalized.grant_types, vec!["authorization_code"]);
        assert_eq!(normalized.scope, "openid");
        assert_eq!(normalized.token_endpoint_auth_method, "client_secret_post");
    }

    #[test]
    fn test_null_lists_get_defaults() {
        let body = serde_json::json!({
            "redirect_uris": ["https://a/cb"],
            "grant_types": null,
            "response_types": null,
            "scope": null
        });
        let req: RegistrationRequest = serde_json::from_value(body).unwrap();
        let normalized = req.normalize();

        assert_eq!(normalized.redirect_uris, vec!["https://a/cb"]);
        assert_eq!(
            normalized.grant_types,
            vec!["authorization_code", "refresh_token"]
        );
        assert_eq!(normalized.response_types, vec!["code"]);
        assert_eq!(normalized.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn test_null_redirect_uris_decode_as_empty() {
        let req: RegistrationRequest = serde_json::from_str(r#"{"redirect_uris":null}"#).unwrap();
        assert!(req.redirect_uris.is_empty());
    }

    #[test]
    fn test_response_always_emits_expiry() {
        let req = RegistrationRequest {
            redirect_uris: vec!["x".to_string()],
            ..Default::default()
        };
        let response = RegistrationResponse::new("cid".to_string(), None, req.normalize());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["client_secret_expires_at"], 0);
        assert!(json.get("client_secret").is_none());
    }
}
