//! Who is currently signed in.
//!
//! Authentication lives elsewhere; the store only needs the identity to
//! stamp on new reports.

use std::sync::{PoisonError, RwLock};

/// Environment variable holding the signed-in user's id.
pub const USER_ID_ENV: &str = "COAST_CONNECT_USER_ID";

/// Environment variable holding the signed-in user's display name.
pub const USER_NAME_ENV: &str = "COAST_CONNECT_USER_NAME";

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    /// Stable user identifier.
    pub id: String,
    /// Name shown on reports.
    pub display_name: String,
}

impl SessionUser {
    /// Creates a session user.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Supplies the current user, if any.
pub trait SessionProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in.
    fn current_user(&self) -> Option<SessionUser>;
}

/// A session where nobody is ever signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousSession;

impl SessionProvider for AnonymousSession {
    fn current_user(&self) -> Option<SessionUser> {
        None
    }
}

/// A session whose user can change at runtime.
#[derive(Debug, Default)]
pub struct SharedSession {
    user: RwLock<Option<SessionUser>>,
}

impl SharedSession {
    /// Creates a session with `user` signed in.
    #[must_use]
    pub const fn signed_in(user: SessionUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// Builds a session from `COAST_CONNECT_USER_ID` and
    /// `COAST_CONNECT_USER_NAME`. The user is signed in only when the id is
    /// set; a missing name falls back to the id.
    #[must_use]
    pub fn from_env() -> Self {
        let id = std::env::var(USER_ID_ENV)
            .ok()
            .filter(|id| !id.trim().is_empty());

        id.map_or_else(Self::default, |id| {
            let name = std::env::var(USER_NAME_ENV).unwrap_or_else(|_| id.clone());
            Self::signed_in(SessionUser::new(id, name))
        })
    }

    /// Signs `user` in, replacing any current user.
    pub fn sign_in(&self, user: SessionUser) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    /// Signs the current user out.
    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionProvider for SharedSession {
    fn current_user(&self) -> Option<SessionUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
