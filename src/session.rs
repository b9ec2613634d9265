//! Session Manager.
//!
//! Sessions are created only by `initialize`, looked up through the
//! `Mcp-Session-Id` header, and expire after an idle period. The table is
//! process memory: a restart silently invalidates every session.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::time::Instant;
use uuid::Uuid;

/// Response/request header carrying the session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub client_info: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Monotonic twin of `last_activity_at`, used for expiry.
    last_seen: Instant,
}

impl Session {
    pub fn client_name(&self) -> Option<&str> {
        self.client_info.get("name").and_then(|v| v.as_str())
    }
}

/// Shared, concurrently accessible session table.
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<String, Session>>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            idle_timeout,
        }
    }

    /// Mint a fresh session (UUIDv4 id).
    pub fn create(&self, client_info: Map<String, Value>) -> Session {
        let now = Utc::now();
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            client_info,
            created_at: now,
            last_activity_at: now,
            last_seen: Instant::now(),
        };
        self.sessions
            .insert(session.session_id.clone(), session.clone());
        tracing::info!(
            session_id = %session.session_id,
            client = session.client_name().unwrap_or("unknown"),
            "session created"
        );
        session
    }

    /// Look up a session and refresh its activity stamp.
    ///
    /// Expired sessions are removed here and reported as absent.
    pub fn touch(&self, session_id: &str) -> Option<Session> {
        let now = Instant::now();
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            if now.duration_since(entry.last_seen) <= self.idle_timeout {
                entry.last_seen = now;
                entry.last_activity_at = Utc::now();
                return Some(entry.clone());
            }
        }
        if self
            .sessions
            .remove_if(session_id, |_, s| now.duration_since(s.last_seen) > self.idle_timeout)
            .is_some()
        {
            tracing::debug!(session_id, "session expired on lookup");
        }
        None
    }

    /// Explicit termination. Returns whether the session existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Drop every session idle for longer than the threshold.
    pub fn reap(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| now.duration_since(s.last_seen) <= self.idle_timeout);
        let reaped = before.saturating_sub(self.sessions.len());
        if reaped > 0 {
            tracing::info!(reaped, remaining = self.sessions.len(), "reaped idle sessions");
        }
        reaped
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
