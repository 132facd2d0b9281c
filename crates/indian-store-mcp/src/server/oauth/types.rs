//! Records held by the gateway's OAuth state stores.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Browser session lifetime in seconds (24 hours).
pub const SESSION_LIFETIME_SECS: i64 = 86_400;

/// A CSRF state issued for the gateway's authorization-code flow.
#[derive(Debug, Clone, Copy)]
pub struct PendingState {
    pub issued_at: Instant,
}

impl PendingState {
    /// Check if the state is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.issued_at.elapsed() >= ttl
    }
}

/// An authenticated browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still valid at `now` (strictly younger than 24h).
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < chrono::TimeDelta::seconds(SESSION_LIFETIME_SECS)
    }

    /// Whether the session is valid right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// Identity attached to a request that passed the auth middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub email: Option<String>,
    pub scope: Option<String>,
}
