use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::session::errors::SessionError;
use crate::session::types::TransientSession;
use crate::storage::DataStore;

use super::session::authenticated_user_for_key;

/// Map of transient sessions that falls back to persistent sessions on a miss.
///
/// A key missing from memory but bound to a user in the `sessions` table
/// comes back as a fresh transient session without a mind; the strategy
/// pre-authenticates it on first use. Anonymous sessions live in memory only.
///
/// Idle sessions are dropped at most one transient lifetime after they expire:
/// adding a session purges the map whenever a lifetime has passed since the
/// last purge.
#[derive(Clone)]
pub struct SessionPassthrough {
    store: DataStore,
    lifetime: Duration,
    sessions: Arc<Mutex<TransientSessions>>,
}

struct TransientSessions {
    entries: HashMap<String, TransientSession>,
    last_purge: Instant,
}

impl TransientSessions {
    fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, session| !session.is_expired());
        self.last_purge = Instant::now();
        before - self.entries.len()
    }

    fn purge_if_due(&mut self, cadence: Duration) {
        if self.last_purge.elapsed() >= cadence {
            let purged = self.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged idle transient sessions");
            }
        }
    }
}

impl std::fmt::Debug for SessionPassthrough {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPassthrough")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl SessionPassthrough {
    /// `lifetime` is given to sessions materialized from the database.
    pub fn new(store: DataStore, lifetime: Duration) -> Self {
        Self {
            store,
            lifetime,
            sessions: Arc::new(Mutex::new(TransientSessions {
                entries: HashMap::new(),
                last_purge: Instant::now(),
            })),
        }
    }

    /// Look up `key`, consulting the persistent sessions on a miss.
    ///
    /// An empty key, an unknown key and a persistent session without a user
    /// are all absent.
    pub async fn get(&self, key: &str) -> Result<Option<TransientSession>, SessionError> {
        if key.is_empty() {
            return Ok(None);
        }

        {
            let mut sessions = self.sessions.lock().await;
            match sessions.entries.get_mut(key) {
                Some(session) if !session.is_expired() => {
                    session.touch();
                    return Ok(Some(session.clone()));
                }
                Some(_) => {
                    tracing::debug!("Transient session expired");
                    sessions.entries.remove(key);
                }
                None => {}
            }
        }

        // The lock is not held across the database round trip
        if authenticated_user_for_key(&self.store, key).await?.is_none() {
            return Ok(None);
        }

        let session = TransientSession::new(key, self.lifetime);
        if session.is_expired() {
            return Ok(None);
        }

        let mut sessions = self.sessions.lock().await;
        sessions.purge_if_due(self.lifetime);
        let session = sessions
            .entries
            .entry(key.to_string())
            .or_insert(session)
            .clone();
        tracing::debug!("Materialized transient session from persistent session");
        Ok(Some(session))
    }

    pub async fn contains(&self, key: &str) -> Result<bool, SessionError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Store `session` in memory only.
    pub async fn insert(&self, key: impl Into<String>, session: TransientSession) {
        let mut sessions = self.sessions.lock().await;
        sessions.purge_if_due(self.lifetime);
        sessions.entries.insert(key.into(), session);
    }

    /// Forget the transient session. The persistent session, if any, stays.
    pub async fn remove(&self, key: &str) -> Option<TransientSession> {
        self.sessions.lock().await.entries.remove(key)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.entries.is_empty()
    }

    /// Drop every idle transient session. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        self.sessions.lock().await.purge_expired()
    }
}
