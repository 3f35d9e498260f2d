//! # Session Store Module
//!
//! Keeps the most recently extracted document text for each user. Storage is
//! process memory only; a restart drops every session.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use teloxide::types::UserId;
use tracing::{debug, info};

use crate::config::SessionConfig;

/// The last successfully extracted document of one user
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub document_text: String,
    pub file_name: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl Session {
    pub fn new(document_text: String, file_name: Option<String>) -> Self {
        Self {
            document_text,
            file_name,
            uploaded_at: Utc::now(),
        }
    }

    /// A session whose text is blank counts as "no document"
    pub fn has_text(&self) -> bool {
        !self.document_text.trim().is_empty()
    }
}

/// Keyed storage for sessions. At most one session per user.
pub trait SessionStore: Send + Sync {
    fn get(&self, user: UserId) -> Option<Session>;
    /// Replace the user's session entirely
    fn put(&self, user: UserId, session: Session);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thread-safe in-memory session store with optional expiry and capacity
///
/// # Eviction
///
/// - With a TTL, sessions older than the TTL are dropped when read
/// - With a capacity, inserting a new user beyond the capacity evicts the
///   session with the oldest upload time
/// - With neither, sessions live until the process exits
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
    config: SessionConfig,
}

impl InMemorySessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A TTL too large for chrono never expires
    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        let ttl = self
            .config
            .ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds);
        match ttl {
            Some(ttl) => now - session.uploaded_at > ttl,
            None => false,
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, user: UserId) -> Option<Session> {
        let mut sessions = self.lock();
        let expired = match sessions.get(&user) {
            Some(session) => self.is_expired(session, Utc::now()),
            None => return None,
        };

        if expired {
            sessions.remove(&user);
            debug!(user_id = user.0, "Session expired");
            return None;
        }
        sessions.get(&user).cloned()
    }

    fn put(&self, user: UserId, session: Session) {
        let mut sessions = self.lock();
        sessions.insert(user, session);

        if let Some(capacity) = self.config.capacity {
            while sessions.len() > capacity {
                let oldest = sessions
                    .iter()
                    .filter(|(key, _)| **key != user)
                    .min_by_key(|(_, s)| s.uploaded_at)
                    .map(|(key, _)| *key);
                match oldest {
                    Some(key) => {
                        sessions.remove(&key);
                        info!(user_id = key.0, "Evicted session to stay within capacity");
                    }
                    None => break,
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
