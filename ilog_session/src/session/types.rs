use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::Mind;

/// A "remember me" session as stored in the `sessions` table
#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct StoredSession {
    /// The session key, also used as the cookie value
    pub id: String,
    /// Seconds since the epoch
    pub last_used: f64,
    /// Username of the bound user
    pub user_id: Option<String>,
}

pub(crate) fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

impl StoredSession {
    pub fn new(id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            last_used: epoch_seconds(),
            user_id,
        }
    }

    pub fn touch(&mut self) {
        self.last_used = epoch_seconds();
    }

    pub fn renew(&mut self) {
        self.touch();
    }

    /// True when unused for longer than `lifetime`.
    pub fn is_stale(&self, lifetime: Duration) -> bool {
        epoch_seconds() - self.last_used > lifetime.as_secs_f64()
    }
}

/// In-memory session state for one browser, keyed by the session cookie.
///
/// Carries the logged-in mind, if any. Never written to the database.
#[derive(Clone, Debug)]
pub struct TransientSession {
    pub uid: String,
    mind: Option<Mind>,
    lifetime: Duration,
    last_accessed: Instant,
}

impl TransientSession {
    pub fn new(uid: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            uid: uid.into(),
            mind: None,
            lifetime,
            last_accessed: Instant::now(),
        }
    }

    pub fn with_mind(mut self, mind: Mind) -> Self {
        self.mind = Some(mind);
        self
    }

    pub fn mind(&self) -> Option<&Mind> {
        self.mind.as_ref()
    }

    pub fn set_mind(&mut self, mind: Option<Mind>) {
        self.mind = mind;
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn set_lifetime(&mut self, lifetime: Duration) {
        self.lifetime = lifetime;
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    /// Idle for at least the session lifetime
    pub fn is_expired(&self) -> bool {
        self.last_accessed.elapsed() >= self.lifetime
    }
}
