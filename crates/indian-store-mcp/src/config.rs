//! Configuration for the Indian Store MCP gateway.

use std::time::Duration;

use crate::error::ConfigError;

/// Default values for optional settings.
pub mod defaults {
    use std::time::Duration;

    /// Bind address.
    pub const HOST: &str = "0.0.0.0";

    /// Listen port.
    pub const PORT: u16 = 8080;

    /// Redirect URI registered for the gateway's own authorization-code flow.
    pub const CALLBACK_URL: &str = "http://localhost:8080/oauth/callback";

    /// Scopes requested by the gateway's own authorization-code flow.
    pub const SCOPES: &str = "openid offline_access";

    /// Hydra admin API reachable from inside the cluster.
    pub const ADMIN_URL: &str = "http://ory-hydra-admin.default.svc.cluster.local:4445";

    /// Placeholder secret; not used by the OAuth delegation path.
    pub const JWT_SECRET: &str = "default-secret-change-in-production";

    /// Access token lifetime in seconds (1 hour).
    pub const ACCESS_TOKEN_LIFETIME: u64 = 3600;

    /// Refresh token lifetime in seconds (7 days).
    pub const REFRESH_TOKEN_LIFETIME: u64 = 604_800;

    /// Deadline for a single outbound provider request.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection timeout for outbound provider requests.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Retries for idempotent provider calls (introspection, userinfo).
    pub const MAX_RETRIES: u32 = 2;

    /// Lifetime of a pending CSRF state.
    pub const STATE_TTL: Duration = Duration::from_secs(600);
}

/// Gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// Bind address.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Public base URL of the identity provider (mandatory).
    pub provider_url: String,

    /// Provider URL for server-to-server token calls, bypassing public ingress.
    pub provider_internal_url: Option<String>,

    /// Provider admin API base URL.
    pub provider_admin_url: String,

    /// OAuth client id used for token exchange and introspection.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Redirect URI for the gateway's own authorization-code flow.
    pub callback_url: String,

    /// Space-separated scopes for the gateway's own authorization-code flow.
    pub scopes: String,

    /// Introspection endpoint override.
    pub introspection_url: Option<String>,

    /// UserInfo endpoint override.
    pub userinfo_url: Option<String>,

    /// JWT signing secret (reserved).
    pub jwt_secret: String,

    /// Access token lifetime in seconds (reserved).
    pub access_token_lifetime: u64,

    /// Refresh token lifetime in seconds (reserved).
    pub refresh_token_lifetime: u64,

    /// Deadline for each outbound provider request.
    pub request_timeout: Duration,

    /// Connection timeout for outbound provider requests.
    pub connect_timeout: Duration,

    /// Retry budget for idempotent provider calls.
    pub max_retries: u32,

    /// Lifetime of a pending CSRF state.
    pub state_ttl: Duration,
}

impl Config {
    /// Create a configuration for the given provider URL with default settings.
    #[must_use]
    pub fn new(provider_url: impl Into<String>) -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            provider_url: trim_base(provider_url.into()),
            provider_internal_url: None,
            provider_admin_url: defaults::ADMIN_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: defaults::CALLBACK_URL.to_string(),
            scopes: defaults::SCOPES.to_string(),
            introspection_url: None,
            userinfo_url: None,
            jwt_secret: defaults::JWT_SECRET.to_string(),
            access_token_lifetime: defaults::ACCESS_TOKEN_LIFETIME,
            refresh_token_lifetime: defaults::REFRESH_TOKEN_LIFETIME,
            request_timeout: defaults::REQUEST_TIMEOUT,
            connect_timeout: defaults::CONNECT_TIMEOUT,
            max_retries: defaults::MAX_RETRIES,
            state_ttl: defaults::STATE_TTL,
        }
    }

    /// Create a test configuration pointing every provider URL at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            provider_admin_url: trim_base(base_url.to_string()),
            client_id: "gateway-client".to_string(),
            client_secret: "gateway-secret".to_string(),
            callback_url: "http://localhost:8080/oauth/callback".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            max_retries: 0, // No retries in tests
            ..Self::new(base_url)
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `ORY_URL` is unset and
    /// [`ConfigError::Invalid`] when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider_url = env_opt("ORY_URL").ok_or(ConfigError::Missing("ORY_URL"))?;
        let mut config = Self::new(provider_url);

        if let Some(host) = env_opt("HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse("PORT")? {
            config.port = port;
        }
        config.provider_internal_url = env_opt("ORY_INTERNAL_URL").map(trim_base);
        if let Some(admin) = env_opt("ORY_ADMIN_URL") {
            config.provider_admin_url = trim_base(admin);
        }
        config.client_id = env_opt("ORY_CLIENT_ID").unwrap_or_default();
        config.client_secret = env_opt("ORY_CLIENT_SECRET").unwrap_or_default();
        if let Some(callback) = env_opt("ORY_CALLBACK_URL") {
            config.callback_url = callback;
        }
        if let Some(scopes) = env_opt("ORY_SCOPES") {
            config.scopes = scopes;
        }
        config.introspection_url = env_opt("ORY_INTROSPECTION_URL");
        config.userinfo_url = env_opt("ORY_USERINFO_URL");
        if let Some(secret) = env_opt("JWT_SECRET") {
            config.jwt_secret = secret;
        }
        if let Some(lifetime) = env_parse("ACCESS_TOKEN_LIFETIME")? {
            config.access_token_lifetime = lifetime;
        }
        if let Some(lifetime) = env_parse("REFRESH_TOKEN_LIFETIME")? {
            config.refresh_token_lifetime = lifetime;
        }
        if let Some(secs) = env_parse("PROVIDER_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse("PROVIDER_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = env_parse("PROVIDER_MAX_RETRIES")? {
            config.max_retries = retries;
        }

        Ok(config)
    }

    /// Token endpoint for server-to-server calls.
    ///
    /// Prefers the internal URL so exchanges avoid the public ingress.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        let base = self
            .provider_internal_url
            .as_deref()
            .unwrap_or(&self.provider_url);
        format!("{base}/oauth2/token")
    }

    /// Introspection endpoint, falling back to the admin API.
    #[must_use]
    pub fn introspection_endpoint(&self) -> String {
        self.introspection_url
            .clone()
            .unwrap_or_else(|| format!("{}/admin/oauth2/introspect", self.provider_admin_url))
    }

    /// UserInfo endpoint, falling back to the public provider URL.
    #[must_use]
    pub fn userinfo_endpoint(&self) -> String {
        self.userinfo_url
            .clone()
            .unwrap_or_else(|| format!("{}/userinfo", self.provider_url))
    }

    /// Socket address string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("provider_url", &self.provider_url)
            .field("provider_internal_url", &self.provider_internal_url)
            .field("provider_admin_url", &self.provider_admin_url)
            .field("client_id", &self.client_id)
            .field("has_client_secret", &!self.client_secret.is_empty())
            .field("callback_url", &self.callback_url)
            .field("scopes", &self.scopes)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env_opt(key) {
        None => Ok(None),
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::Invalid { key, value }),
        },
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
