//! CSRF state and browser session stores.
//!
//! Both stores sit behind traits so a shared backend can replace the in-memory
//! maps when the gateway runs as more than one instance. The in-memory versions
//! follow the same pattern: a locked map plus a periodic cleanup task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::types::{PendingState, Session};
use crate::config::defaults;

/// Cleanup interval: 5 minutes.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Generate a random URL-safe token from 32 bytes of OS entropy.
pub fn generate_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// One-time CSRF states for the authorization-code flow.
#[async_trait]
pub trait CsrfStore: Send + Sync {
    /// Issue and record a new state.
    async fn issue(&self) -> String;

    /// Remove `state` if pending. Returns true for exactly one caller per issued state.
    async fn consume(&self, state: &str) -> bool;
}

/// Authenticated browser sessions keyed by cookie value.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for `email`.
    async fn create(&self, email: &str) -> Session;

    /// Look up a session. Expired sessions are reported as absent.
    async fn lookup(&self, session_id: &str) -> Option<Session>;

    /// Drop expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> usize;
}

// ─── CSRF states ─────────────────────────────────────────────────────────────

/// In-memory [`CsrfStore`].
///
/// A single exclusive lock guards check-and-remove, so concurrent consumers of
/// the same state cannot both succeed.
#[derive(Clone)]
pub struct InMemoryCsrfStore {
    states: Arc<Mutex<HashMap<String, PendingState>>>,
    ttl: Duration,
}

impl InMemoryCsrfStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(defaults::STATE_TTL)
    }

    /// Create a store whose states expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Number of pending states, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.states.lock().await.len()
    }

    /// Whether no states are pending.
    pub async fn is_empty(&self) -> bool {
        self.states.lock().await.is_empty()
    }

    /// Drop expired states, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut states = self.states.lock().await;
        let before = states.len();
        states.retain(|_, pending| !pending.is_expired(self.ttl));
        before - states.len()
    }

    /// Start background cleanup task for expired states.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    tracing::debug!(count = removed, "Cleaned up expired CSRF states");
                }
            }
        });
    }
}

#[async_trait]
impl CsrfStore for InMemoryCsrfStore {
    async fn issue(&self) -> String {
        let state = generate_token();
        let pending = PendingState {
            issued_at: Instant::now(),
        };
        self.states.lock().await.insert(state.clone(), pending);
        state
    }

    async fn consume(&self, state: &str) -> bool {
        let Some(pending) = self.states.lock().await.remove(state) else {
            return false;
        };
        !pending.is_expired(self.ttl)
    }
}

impl Default for InMemoryCsrfStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCsrfStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCsrfStore")
            .field("ttl", &self.ttl)
            .finish()
    }
}

// ─── Browser sessions ────────────────────────────────────────────────────────

/// In-memory [`SessionStore`].
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session as-is, e.g. one with a backdated `created_at`.
    pub async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session);
    }

    /// Number of stored sessions, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Start background cleanup task for expired sessions.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    tracing::debug!(count = removed, "Cleaned up expired sessions");
                }
            }
        });
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, email: &str) -> Session {
        let session = Session {
            id: generate_token(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        session
    }

    async fn lookup(&self, session_id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).filter(|s| s.is_valid()).cloned()
    }

    async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_valid_at(now));
        before - sessions.len()
    }
}

impl std::fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStore").finish()
    }
}
