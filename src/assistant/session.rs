//! Chat session store
//!
//! Each session owns one transcript behind an async mutex. A turn holds that
//! mutex from the user append until the assistant append, so turns on one
//! session never interleave. Sessions idle past the configured limit are
//! dropped, and the store never holds more than `capacity` sessions.

use super::Transcript;
use crate::config::AssistantSettings;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::MutexGuard;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// One conversation
pub struct Session {
    transcript: tokio::sync::Mutex<Transcript>,
    last_active: Mutex<Instant>,
}

impl Session {
    fn new() -> Self {
        Self {
            transcript: tokio::sync::Mutex::new(Transcript::new()),
            last_active: Mutex::new(Instant::now()),
        }
    }

    /// Exclusive access to the transcript, waiting for any turn in flight
    pub async fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().await
    }

    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    fn last_active(&self) -> Instant {
        *self.last_active.lock()
    }
}

/// Open chat sessions keyed by id
pub struct SessionStore {
    sessions: DashMap<Uuid, Arc<Session>>,
    idle_limit: Duration,
    capacity: usize,
}

impl SessionStore {
    pub fn new(idle_limit: Duration, capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_limit,
            capacity: capacity.max(1),
        }
    }

    pub fn from_settings(settings: &AssistantSettings) -> Self {
        Self::new(
            Duration::from_secs(settings.session_idle_secs),
            settings.max_sessions,
        )
    }

    /// Open a session, making room first if the store is full
    pub fn create(&self) -> Uuid {
        self.evict_idle();
        while self.sessions.len() >= self.capacity {
            if !self.evict_oldest() {
                break;
            }
        }

        let id = Uuid::new_v4();
        self.sessions.insert(id, Arc::new(Session::new()));
        id
    }

    /// Session by id, marked as active
    pub fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.get(&id).map(|s| s.value().clone())?;
        session.touch();
        Some(session)
    }

    /// Close a session; a turn already in flight still completes
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Drop sessions idle longer than the limit, returning how many went
    pub fn evict_idle(&self) -> usize {
        let before = self.sessions.len();
        let idle_limit = self.idle_limit;
        self.sessions
            .retain(|_, session| session.last_active().elapsed() <= idle_limit);

        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!("Evicted {} idle chat session(s)", evicted);
        }
        evicted
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().last_active())
            .map(|entry| *entry.key());

        match oldest {
            Some(id) => {
                debug!("Chat session store full, dropping {}", id);
                self.sessions.remove(&id).is_some()
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
