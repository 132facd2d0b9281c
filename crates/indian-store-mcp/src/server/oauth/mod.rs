//! OAuth delegation to the identity provider.
//!
//! The gateway issues no tokens of its own. It:
//! - advertises provider endpoints (RFC 8414 metadata)
//! - forwards RFC 7591 dynamic client registration to the admin API
//! - serves the provider's login and consent pages
//! - runs its own authorization-code client (`/oauth/start`, `/oauth/callback`)
//! - proxies refresh, userinfo and introspection
//! - guards `/mcp` with bearer-token introspection

pub mod handlers;
pub mod login;
pub mod middleware;
pub mod pages;
pub mod registration;
pub mod store;
mod types;

pub use store::{CsrfStore, InMemoryCsrfStore, InMemorySessionStore, SessionStore};
pub use types::{Identity, SESSION_LIFETIME_SECS, Session};
