use crate::models::User;
use std::sync::Arc;
use tokio::sync::watch;

/// Holds the authenticated user and notifies subscribers on every change.
///
/// Every `set_current_user` produces a new `Arc`, so subscribers can tell
/// replacements apart with `Arc::ptr_eq` even when the contents are equal.
#[derive(Debug)]
pub struct UserStore {
    current: watch::Sender<Option<Arc<User>>>,
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    pub fn get_current_user(&self) -> Option<Arc<User>> {
        self.current.borrow().clone()
    }

    pub fn set_current_user(&self, user: User) -> Arc<User> {
        let user = Arc::new(user);
        tracing::debug!(user = %user.display_name(), "current user replaced");
        self.current.send_replace(Some(user.clone()));
        user
    }

    pub fn clear_current_user(&self) {
        tracing::debug!("current user cleared");
        self.current.send_replace(None);
    }

    /// Change notifications; the receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<User>>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = UserStore::new();
        let mut changes = store.subscribe();
        assert!(changes.borrow_and_update().is_none());

        store.set_current_user(User {
            username: Some("jdoe".into()),
            ..Default::default()
        });
        changes.changed().await.unwrap();
        assert_eq!(
            changes.borrow_and_update().as_ref().and_then(|u| u.username.clone()),
            Some("jdoe".to_string())
        );

        store.clear_current_user();
        changes.changed().await.unwrap();
        assert!(changes.borrow().is_none());
        assert!(store.get_current_user().is_none());
    }

    #[test]
    fn replacing_with_equal_user_changes_identity() {
        let store = UserStore::new();
        let first = store.set_current_user(User::default());
        let second = store.set_current_user(User::default());
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &store.get_current_user().unwrap()));
    }
}
