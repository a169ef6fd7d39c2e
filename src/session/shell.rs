use std::fmt;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{PersistedSession, SessionError, SessionStore};
use crate::database::User;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Page {
    Login,
    Home,
    Courses,
    SubjectDetails { subject: String },
    Profile,
    Dashboard,
    LearnMore,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Login => write!(f, "Login"),
            Page::Home => write!(f, "Home"),
            Page::Courses => write!(f, "Courses"),
            Page::SubjectDetails { subject } => write!(f, "Subject: {}", subject),
            Page::Profile => write!(f, "Profile"),
            Page::Dashboard => write!(f, "Dashboard"),
            Page::LearnMore => write!(f, "Learn More"),
        }
    }
}

/// Current user and page, backed by an injected [`SessionStore`].
pub struct Shell<S> {
    store: S,
    user: Option<User>,
    page: Page,
}

impl<S: SessionStore> Shell<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            user: None,
            page: Page::Login,
        }
    }

    /// Loads the cached session. Missing, unreadable or expired sessions all
    /// leave the shell logged out on the login page.
    pub fn restore(&mut self) -> Option<&User> {
        self.restore_at(Utc::now().timestamp_millis())
    }

    pub fn restore_at(&mut self, now_ms: i64) -> Option<&User> {
        let session = match self.store.load() {
            Ok(Some(session)) if !session.is_expired_at(now_ms) => Some(session),
            Ok(Some(_)) => {
                info!("🔒 Cached session expired, signing out");
                self.discard_cache();
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable session: {}", e);
                self.discard_cache();
                None
            }
        };

        match session {
            Some(session) => {
                info!("🔓 Restored session for {}", session.user.email);
                self.user = Some(session.user);
                self.page = Page::Home;
            }
            None => {
                self.user = None;
                self.page = Page::Login;
            }
        }
        self.user.as_ref()
    }

    /// Records a successful login or registration.
    pub fn sign_in(&mut self, user: User) -> Result<(), SessionError> {
        self.store.save(&PersistedSession::new(user.clone()))?;
        self.user = Some(user);
        self.page = Page::Home;
        Ok(())
    }

    pub fn sign_out(&mut self) -> Result<(), SessionError> {
        self.user = None;
        self.page = Page::Login;
        self.store.clear()
    }

    /// Replaces the cached user after a profile edit, with a fresh timestamp.
    pub fn refresh_user(&mut self, user: User) -> Result<(), SessionError> {
        self.store.save(&PersistedSession::new(user.clone()))?;
        self.user = Some(user);
        Ok(())
    }

    /// Switches page. Logged-out shells stay on the login page.
    pub fn navigate(&mut self, page: Page) -> &Page {
        if self.user.is_some() && page != Page::Login {
            self.page = page;
        }
        &self.page
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn discard_cache(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear session cache: {}", e);
        }
    }
}
