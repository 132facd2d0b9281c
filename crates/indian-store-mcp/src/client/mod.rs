//! Identity provider client.
//!
//! Wraps every outbound call to the provider's public API (authorize URL, token
//! exchange and refresh, introspection, userinfo) and its admin API (login and
//! consent acceptance, client creation).
//!
//! Two middleware stacks share one connection pool:
//! - `retrying` retries transient failures with exponential backoff and is only
//!   used for idempotent reads
//! - `client` sends exactly once and carries code exchange, refresh and admin writes

use std::time::Duration;

use reqwest::{Client, header};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::{ProviderError, ProviderResult};
use crate::models::{
    ClientCreateRequest, ClientCreateResponse, ConsentAcceptRequest, ConsentRequest,
    IntrospectionResult, LoginAcceptRequest, RedirectResponse, TokenResponse, UserInfo,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

const LOGIN_ACCEPT_PATH: &str = "/admin/oauth2/auth/requests/login/accept";
const CONSENT_PATH: &str = "/admin/oauth2/auth/requests/consent";
const CONSENT_ACCEPT_PATH: &str = "/admin/oauth2/auth/requests/consent/accept";

/// Client for the identity provider and its admin API.
#[derive(Clone)]
pub struct ProviderClient {
    /// Single-shot client for non-idempotent calls.
    client: ClientWithMiddleware,

    /// Client with retry middleware for idempotent calls.
    retrying: ClientWithMiddleware,

    provider_url: String,
    admin_url: String,
    token_url: String,
    introspection_url: String,
    userinfo_url: String,
    client_id: String,
    client_secret: String,
    callback_url: String,
    scopes: String,
}

impl ProviderClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(JSON_CONTENT_TYPE),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(200), Duration::from_secs(5))
            .build_with_max_retries(config.max_retries);

        let retrying = ClientBuilder::new(http.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        let client = ClientBuilder::new(http).build();

        Ok(Self {
            client,
            retrying,
            provider_url: config.provider_url.clone(),
            admin_url: config.provider_admin_url.clone(),
            token_url: config.token_endpoint(),
            introspection_url: config.introspection_endpoint(),
            userinfo_url: config.userinfo_endpoint(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            scopes: config.scopes.clone(),
        })
    }

    // ─── Public API ──────────────────────────────────────────────────────────

    /// Build the provider authorization URL for the gateway's own client.
    ///
    /// # Errors
    ///
    /// Returns error if the configured provider URL is not a valid base.
    pub fn authorization_url(&self, state: &str) -> ProviderResult<Url> {
        let mut url = Url::parse(&format!("{}/oauth2/auth", self.provider_url))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.callback_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes)
            .append_pair("state", state);
        Ok(url)
    }

    /// Exchange an authorization code for tokens. Never retried.
    pub async fn exchange_code(&self, code: &str) -> ProviderResult<TokenResponse> {
        let body = form_body(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.callback_url),
        ]);
        self.token_request(body).await
    }

    /// Exchange a refresh token for new tokens. Never retried.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<TokenResponse> {
        let body = form_body(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ]);
        self.token_request(body).await
    }

    async fn token_request(&self, body: String) -> ProviderResult<TokenResponse> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        read_json(response).await
    }

    /// Introspect a token (RFC 7662).
    pub async fn introspect(&self, token: &str) -> ProviderResult<IntrospectionResult> {
        let response = self
            .retrying
            .post(&self.introspection_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form_body(&[("token", token)]))
            .send()
            .await?;

        read_json(response).await
    }

    /// Introspect a token, collapsing every failure into an inactive result.
    pub async fn validate_token(&self, token: &str) -> IntrospectionResult {
        match self.introspect(token).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Introspection failed, treating token as inactive");
                IntrospectionResult::inactive()
            }
        }
    }

    /// Fetch OIDC userinfo for an access token.
    pub async fn user_info(&self, access_token: &str) -> ProviderResult<UserInfo> {
        let response = self
            .retrying
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        read_json(response).await
    }

    // ─── Admin API ───────────────────────────────────────────────────────────

    /// Accept a login challenge. Never retried.
    pub async fn accept_login(
        &self,
        challenge: &str,
        request: &LoginAcceptRequest,
    ) -> ProviderResult<RedirectResponse> {
        let url = self.admin_endpoint(LOGIN_ACCEPT_PATH, "login_challenge", challenge)?;
        self.put_json(url, request).await
    }

    /// Fetch the consent request behind a consent challenge.
    pub async fn consent_request(&self, challenge: &str) -> ProviderResult<ConsentRequest> {
        let url = self.admin_endpoint(CONSENT_PATH, "consent_challenge", challenge)?;
        let response = self.retrying.get(url).send().await?;

        read_json(response).await
    }

    /// Accept a consent challenge. Never retried.
    pub async fn accept_consent(
        &self,
        challenge: &str,
        request: &ConsentAcceptRequest,
    ) -> ProviderResult<RedirectResponse> {
        let url = self.admin_endpoint(CONSENT_ACCEPT_PATH, "consent_challenge", challenge)?;
        self.put_json(url, request).await
    }

    /// Create an OAuth client through the admin API. Never retried.
    pub async fn create_client(
        &self,
        request: &ClientCreateRequest,
    ) -> ProviderResult<ClientCreateResponse> {
        let body = serde_json::to_string(request).map_err(ProviderError::Encode)?;
        let response = self
            .client
            .post(format!("{}/admin/clients", self.admin_url))
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        read_json(response).await
    }

    async fn put_json<B: serde::Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> ProviderResult<RedirectResponse> {
        let body = serde_json::to_string(body).map_err(ProviderError::Encode)?;
        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        read_json(response).await
    }

    fn admin_endpoint(&self, path: &str, param: &str, challenge: &str) -> ProviderResult<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.admin_url))?;
        url.query_pairs_mut().append_pair(param, challenge);
        Ok(url)
    }

    /// Public provider base URL.
    #[must_use]
    pub fn provider_url(&self) -> &str {
        &self.provider_url
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("provider_url", &self.provider_url)
            .field("admin_url", &self.admin_url)
            .field("client_id", &self.client_id)
            .finish()
    }
}

fn form_body(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Map a provider response to `T`, keeping the raw body on failure.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(ProviderError::upstream(status.as_u16(), String::from_utf8_lossy(&body)));
    }

    serde_json::from_slice(&body).map_err(|source| ProviderError::Decode {
        source,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url() {
        let mut config = Config::for_testing("https://auth.example.com");
        config.scopes = "openid offline_access".to_string();
        let client = ProviderClient::new(&config).unwrap();

        let url = client.authorization_url("xyz").unwrap();
        assert_eq!(url.path(), "/oauth2/auth");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "gateway-client".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "openid offline_access".to_string())));
        assert!(pairs.contains(&("state".to_string(), "xyz".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:8080/oauth/callback".to_string()
        )));
    }

    #[test]
    fn test_admin_endpoint_encodes_challenge() {
        let client = ProviderClient::new(&Config::for_testing("http://hydra:4445")).unwrap();
        let url = client
            .admin_endpoint(LOGIN_ACCEPT_PATH, "login_challenge", "a b&c")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://hydra:4445/admin/oauth2/auth/requests/login/accept?login_challenge=a+b%26c"
        );
    }

    #[test]
    fn test_form_body() {
        assert_eq!(form_body(&[("token", "a+b c")]), "token=a%2Bb+c");
    }

    #[test]
    fn test_debug_hides_secret() {
        let client = ProviderClient::new(&Config::for_testing("http://hydra:4444")).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("gateway-secret"));
    }
}
