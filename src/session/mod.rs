pub mod file_store;
pub mod shell;

pub use file_store::FileSessionStore;
pub use shell::{Page, Shell};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::User;

/// A cached login is honoured for seven days from when it was saved.
pub const SESSION_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session data is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// What survives a restart: the signed-in user and when they signed in
/// (milliseconds since the Unix epoch).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PersistedSession {
    pub user: User,
    pub timestamp: i64,
}

impl PersistedSession {
    pub fn new(user: User) -> Self {
        Self {
            user,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp > SESSION_TTL_MS
    }
}

/// Single-slot persistence for the current session.
pub trait SessionStore {
    fn load(&self) -> Result<Option<PersistedSession>, SessionError>;
    fn save(&self, session: &PersistedSession) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

impl<T: SessionStore + ?Sized> SessionStore for &T {
    fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
        (**self).load()
    }

    fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        (**self).save(session)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}
