//! Synchronously readable session slot.
//!
//! Holds a snapshot of the authenticated user outside the async engine
//! so the UI can render a last-known user before the store has finished
//! opening. Refreshed on every successful login and profile update,
//! cleared on logout.

use std::sync::{Arc, RwLock};

use crate::users::User;

/// Shared slot caching the current user's snapshot.
#[derive(Clone, Default)]
pub struct SessionHolder {
    inner: Arc<RwLock<Option<User>>>,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current user, if any.
    pub fn get(&self) -> Option<User> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }

    /// Whether a user is currently signed in.
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_ok_and(|guard| guard.is_some())
    }

    /// Replace the snapshot.
    pub fn set(&self, user: User) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(user);
        }
    }

    /// Refresh the snapshot only when it belongs to the same account.
    pub fn refresh(&self, user: &User) {
        if let Ok(mut guard) = self.inner.write()
            && guard.as_ref().is_some_and(|current| current.id == user.id)
        {
            *guard = Some(user.clone());
        }
    }

    /// Drop the snapshot.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
