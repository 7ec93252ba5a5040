//! Per-upload sessions
//!
//! A session keeps the uploaded source bytes, the descriptors scanned from
//! them and the template the designer is building. The source bytes are
//! never replaced; every fill or build works on a copy.
//!
//! Sessions idle for longer than the store's time-to-live are dropped, and
//! the least recently used ones go first once the store is full.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use acroform_core::{FieldDescriptor, Template};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;

/// Sessions kept before the least recently used is evicted
pub const DEFAULT_MAX_SESSIONS: usize = 64;

/// Idle time after which a session is dropped
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct Session {
    pub file_name: String,
    pub source: Arc<Vec<u8>>,
    pub fields: Vec<FieldDescriptor>,
    pub template: Option<Template>,
}

struct Entry {
    session: Session,
    last_used: Instant,
}

/// In-memory session registry
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    max_sessions: usize,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn with_limits(max_sessions: usize, ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
            ttl,
        }
    }

    /// Store a new session, making room for it first
    pub async fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();

        let expired = self.evict_stale(&mut sessions, now);
        let evicted = evict_lru(&mut sessions, self.max_sessions - 1);
        if expired + evicted > 0 {
            tracing::debug!(
                "Dropped {} expired and {} least recently used sessions",
                expired,
                evicted
            );
        }

        sessions.insert(
            id,
            Entry {
                session,
                last_used: now,
            },
        );
        id
    }

    pub async fn get(&self, id: Uuid) -> Result<Session, ApiError> {
        let mut sessions = self.sessions.write().await;
        let entry = self.live_entry(&mut sessions, id)?;
        Ok(entry.session.clone())
    }

    pub async fn set_template(&self, id: Uuid, template: Template) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write().await;
        let entry = self.live_entry(&mut sessions, id)?;
        entry.session.template = Some(template);
        Ok(())
    }

    /// Drop the saved template once it has been turned into fields
    pub async fn take_template(&self, id: Uuid) -> Result<Option<Template>, ApiError> {
        let mut sessions = self.sessions.write().await;
        let entry = self.live_entry(&mut sessions, id)?;
        Ok(entry.session.template.take())
    }

    /// Close a session and release its document
    pub async fn remove(&self, id: Uuid) -> Result<(), ApiError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(ApiError::SessionNotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Look up a session that has not expired and mark it as used
    fn live_entry<'a>(
        &self,
        sessions: &'a mut HashMap<Uuid, Entry>,
        id: Uuid,
    ) -> Result<&'a mut Entry, ApiError> {
        let now = Instant::now();
        let expired = sessions
            .get(&id)
            .is_some_and(|entry| now.duration_since(entry.last_used) > self.ttl);
        if expired {
            sessions.remove(&id);
            tracing::debug!("Session {} expired", id);
        }

        let entry = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
        entry.last_used = now;
        Ok(entry)
    }

    /// Remove sessions idle for longer than the time-to-live
    fn evict_stale(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) <= self.ttl);
        before - sessions.len()
    }
}

/// Remove the least recently used sessions until at most `keep` remain
fn evict_lru(sessions: &mut HashMap<Uuid, Entry>, keep: usize) -> usize {
    if sessions.len() <= keep {
        return 0;
    }

    let mut candidates: Vec<(Uuid, Instant)> = sessions
        .iter()
        .map(|(id, entry)| (*id, entry.last_used))
        .collect();
    candidates.sort_by_key(|(_, last_used)| *last_used);

    let count = sessions.len() - keep;
    for (id, _) in candidates.into_iter().take(count) {
        sessions.remove(&id);
    }
    count
}
