use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Short-lived memory of the password typed at the last login.
///
/// Only ever held in process memory, and consumed the first time it proves
/// the server's "weak password" flag stale.
#[derive(Default)]
pub struct AuthSessionStore {
    last_login_password: Mutex<Option<Secret<String>>>,
}

impl fmt::Debug for AuthSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSessionStore")
            .field("has_password", &self.has_password())
            .finish()
    }
}

impl AuthSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Secret<String>>> {
        self.last_login_password
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn remember_password(&self, password: Secret<String>) {
        *self.slot() = Some(password);
    }

    pub fn get_last_login_password(&self) -> Option<Secret<String>> {
        self.slot()
            .as_ref()
            .map(|secret| Secret::new(secret.expose_secret().clone()))
    }

    pub fn clear_last_login_password(&self) {
        *self.slot() = None;
    }

    pub fn has_password(&self) -> bool {
        self.slot().is_some()
    }
}
