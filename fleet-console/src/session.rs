use crate::errors::LoginError;
use crate::models::User;
use crate::services::ApiClient;
use crate::stores::{AuthSessionStore, UserStore};
use secrecy::Secret;
use std::sync::Arc;

/// Signs users in and out of the console.
///
/// A successful login populates the user store (which wakes the profile
/// gate) and keeps the typed password in the auth-session store so the gate
/// can re-check a stale "weak password" flag.
pub struct Session {
    api: Arc<ApiClient>,
    users: Arc<UserStore>,
    auth_session: Arc<AuthSessionStore>,
}

impl Session {
    pub fn new(api: Arc<ApiClient>, users: Arc<UserStore>, auth_session: Arc<AuthSessionStore>) -> Self {
        Self {
            api,
            users,
            auth_session,
        }
    }

    pub async fn login(&self, identifier: &str, password: Secret<String>) -> Result<Arc<User>, LoginError> {
        let user = self.api.login(identifier, &password).await?;

        tracing::info!(
            user = %user.display_name(),
            requires_profile_update = user.requires_profile_update,
            "User logged in successfully"
        );

        self.auth_session.remember_password(password);
        Ok(self.users.set_current_user(user))
    }

    /// Drop the local session after the server reported it expired.
    pub fn expire(&self) {
        tracing::warn!("session expired; clearing local user");
        self.auth_session.clear_last_login_password();
        self.users.clear_current_user();
    }
}

/// Host-side reaction to the API rejecting the session.
pub trait SessionExpiry: Send + Sync {
    fn session_expired(&self);
}

impl SessionExpiry for Session {
    fn session_expired(&self) {
        self.expire();
    }
}
