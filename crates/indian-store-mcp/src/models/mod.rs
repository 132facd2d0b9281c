//! Wire types exchanged with the identity provider.
//!
//! Public endpoints (token, introspection, userinfo) use `snake_case` field names
//! matching RFC 6749/7662; admin payloads mirror Hydra's admin API.

mod admin;
mod registration;
mod token;

pub use admin::{
    ClientCreateRequest, ClientCreateResponse, ConsentAcceptRequest, ConsentClient, ConsentRequest,
    ConsentSession, IdTokenClaims, LoginAcceptRequest, RedirectResponse,
};
pub use registration::{
    DEFAULT_AUTH_METHOD, DEFAULT_SCOPE, RegistrationRequest, RegistrationResponse,
};
pub use token::{IntrospectionResult, TokenResponse, UserInfo};
