//! MCP session registry.
//!
//! Tracks which MCP sessions completed `initialize`. A session is keyed by its
//! `Mcp-Session-Id`, or by the authenticated subject for clients that do not
//! echo the header. Idle sessions are dropped by a background cleanup task and
//! must initialize again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Idle time after which a session is forgotten.
const SESSION_TIMEOUT: Duration = Duration::from_secs(3600); // 1 hour

/// Cleanup interval for stale sessions.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// An initialized MCP session.
pub struct McpSession {
    /// Session key.
    pub id: String,
    /// When `initialize` first succeeded.
    pub created_at: Instant,
    /// Last activity timestamp.
    last_active: RwLock<Instant>,
}

impl McpSession {
    fn new(id: String) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_active: RwLock::new(now),
        }
    }

    /// Check if session has been idle longer than `timeout`.
    pub async fn is_stale(&self, timeout: Duration) -> bool {
        self.last_active.read().await.elapsed() > timeout
    }

    /// Update last activity timestamp.
    pub async fn touch(&self) {
        *self.last_active.write().await = Instant::now();
    }
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Registry of initialized MCP sessions.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Arc<McpSession>>>>,
    timeout: Duration,
}

impl SessionManager {
    /// Create a new session manager.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(SESSION_TIMEOUT)
    }

    /// Create a session manager with a custom idle timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            timeout,
        }
    }

    /// Mark `key` as initialized. Re-initializing an existing session only refreshes it.
    pub async fn mark_initialized(&self, key: &str) -> Arc<McpSession> {
        if let Some(session) = self.get(key).await {
            session.touch().await;
            return session;
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(key.to_string()).or_insert_with(|| {
            tracing::info!(session_id = %key, "MCP session initialized");
            Arc::new(McpSession::new(key.to_string()))
        });
        Arc::clone(session)
    }

    /// Whether `key` completed `initialize`. Refreshes the session on success.
    pub async fn is_initialized(&self, key: &str) -> bool {
        match self.get(key).await {
            Some(session) => {
                session.touch().await;
                true
            }
            None => false,
        }
    }

    async fn get(&self, key: &str) -> Option<Arc<McpSession>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Clean up stale sessions.
    pub async fn cleanup_stale_sessions(&self) -> usize {
        let mut to_remove = Vec::new();

        {
            let sessions = self.sessions.read().await;
            for (id, session) in sessions.iter() {
                if session.is_stale(self.timeout).await {
                    to_remove.push(id.clone());
                }
            }
        }

        let count = to_remove.len();
        if count > 0 {
            let mut sessions = self.sessions.write().await;
            for id in to_remove {
                sessions.remove(&id);
                tracing::info!(session_id = %id, "Cleaned up stale MCP session");
            }
        }

        count
    }

    /// Get session count (for monitoring).
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Start background cleanup task.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let cleaned = self.cleanup_stale_sessions().await;
                if cleaned > 0 {
                    let remaining = self.session_count().await;
                    tracing::debug!(count = cleaned, remaining, "MCP session cleanup completed");
                }
            }
        });
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialization_is_per_session() {
        let manager = SessionManager::new();
        assert!(!manager.is_initialized("a").await);

        manager.mark_initialized("a").await;
        assert!(manager.is_initialized("a").await);
        assert!(!manager.is_initialized("b").await);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_reinitialize_keeps_single_entry() {
        let manager = SessionManager::new();
        let first = manager.mark_initialized("a").await;
        let second = manager.mark_initialized("a").await;
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_stale_sessions_are_removed() {
        let manager = SessionManager::with_timeout(Duration::ZERO);
        manager.mark_initialized("a").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(manager.cleanup_stale_sessions().await, 1);
        assert!(!manager.is_initialized("a").await);
    }
}
