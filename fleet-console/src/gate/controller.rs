use super::assessment::{self, GateRules};
use super::state::{GatePhase, GateState, UpdateOutcome};
use crate::config::{GateSettings, PasswordPolicy};
use crate::errors::ApiError;
use crate::models::{FieldFlags, ProfileForm, User};
use crate::services::{GateMetrics, Navigator, Notifier, ProfileApi, Toast};
use crate::session::SessionExpiry;
use crate::stores::{AuthSessionStore, UserStore};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::instrument;

pub const UPDATE_FAILED_MESSAGE: &str = "Failed to update profile. Please try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const INVALID_FORM_MESSAGE: &str = "Please correct the highlighted fields.";

const TOAST_FULLY_UPDATED: &str =
    "Profile updated successfully. You will be logged out to apply the changes.";
const TOAST_PARTIALLY_UPDATED: &str =
    "Profile updated, but some fields still need attention. You will be logged out to apply the changes.";
const LOGIN_MESSAGE_FULLY_UPDATED: &str = "Profile updated successfully. Please log in again.";
const LOGIN_MESSAGE_PARTIALLY_UPDATED: &str =
    "Profile updated, but some fields still need attention. Please log in again to finish.";

/// Collaborators the gate is wired to.
pub struct GateDependencies {
    pub api: Arc<dyn ProfileApi>,
    pub users: Arc<UserStore>,
    pub auth_session: Arc<AuthSessionStore>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    /// Told when the API rejects the session; clearing the store re-triggers
    /// evaluation into hidden.
    pub session: Arc<dyn SessionExpiry>,
    pub metrics: GateMetrics,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub rules: GateRules,
    pub logout_delay: Duration,
    pub login_route: String,
}

impl GateConfig {
    pub fn from_settings(gate: &GateSettings, password_policy: &PasswordPolicy) -> Self {
        Self {
            rules: GateRules::from_settings(gate, password_policy),
            logout_delay: Duration::from_millis(gate.logout_delay_ms),
            login_route: gate.login_route.clone(),
        }
    }
}

struct GateInner {
    deps: GateDependencies,
    config: GateConfig,
    state: Mutex<GateState>,
    /// Bumped by every evaluation and every accepted update; a pass commits
    /// only while the epoch it started with is still the latest.
    epoch: AtomicU64,
    /// Set between an accepted update and the end of the forced logout so
    /// the store change caused by the update cannot reopen the form.
    just_updated: AtomicBool,
    pending_logout: Mutex<Option<JoinHandle<()>>>,
}

/// Session guard that blocks the console until the user's profile is valid.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct ProfileGate {
    inner: Arc<GateInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ProfileGate {
    pub fn new(deps: GateDependencies, config: GateConfig) -> Self {
        Self {
            inner: Arc::new(GateInner {
                deps,
                config,
                state: Mutex::new(GateState::default()),
                epoch: AtomicU64::new(0),
                just_updated: AtomicBool::new(false),
                pending_logout: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> GateState {
        lock(&self.inner.state).clone()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner.state).open
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.inner.deps.metrics
    }

    fn next_epoch(&self) -> u64 {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `update` unless a newer pass has started since `epoch`.
    fn commit<F>(&self, epoch: u64, update: F) -> bool
    where
        F: FnOnce(&mut GateState),
    {
        let mut state = lock(&self.inner.state);
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(epoch, "discarding stale gate evaluation");
            self.inner.deps.metrics.record_evaluation("stale");
            return false;
        }
        update(&mut state);
        true
    }

    /// Re-evaluate the gate against the current user.
    ///
    /// Safe to call at any time; a pass overtaken by a newer one drops its
    /// result.
    #[instrument(skip(self), fields(component = "profile-gate", operation = "evaluate", epoch))]
    pub async fn evaluate(&self) {
        let deps = &self.inner.deps;
        let rules = &self.inner.config.rules;
        let epoch = self.next_epoch();
        tracing::Span::current().record("epoch", epoch);

        let Some(user) = deps.users.get_current_user() else {
            self.inner.just_updated.store(false, Ordering::SeqCst);
            if self.commit(epoch, GateState::reset) {
                deps.metrics.record_evaluation("no_user");
            }
            return;
        };

        if self.inner.just_updated.load(Ordering::SeqCst) {
            tracing::debug!(epoch, "gate evaluation suppressed during forced logout");
            deps.metrics.record_evaluation("suppressed");
            return;
        }

        if assessment::is_role_exempt(&user, rules) {
            if self.commit(epoch, GateState::reset) {
                tracing::debug!(user = %user.display_name(), "profile validation bypassed for role");
                deps.metrics.record_evaluation("exempt");
            }
            return;
        }

        let resolved = if assessment::should_refetch(&user) {
            match self.refetch(epoch, &user).await {
                Some(fresh) => fresh,
                None => return,
            }
        } else {
            user
        };

        let cached_password = deps.auth_session.get_last_login_password();
        let outcome = assessment::assess(
            &resolved,
            cached_password.as_ref().map(|p| p.expose_secret().as_str()),
            rules,
        );

        let committed = self.commit(epoch, |state| {
            state.current_data = Some(outcome.current_data.clone());
            if outcome.needs_update {
                state.invalid_fields = outcome.invalid_fields.clone();
                state.field_reasons = outcome.field_reasons.clone();
                state.open = true;
                state.phase = GatePhase::Blocking;
            } else {
                state.invalid_fields.clear();
                state.field_reasons.clear();
                state.open = false;
                state.phase = GatePhase::Idle;
            }
        });
        if !committed {
            return;
        }

        if outcome.password_revalidated {
            tracing::info!(user = %resolved.display_name(), "cached login password meets policy; password flag cleared");
            deps.auth_session.clear_last_login_password();
        }

        if outcome.needs_update {
            tracing::info!(
                user = %resolved.display_name(),
                fields = ?outcome.invalid_fields.keys().collect::<Vec<_>>(),
                "profile update required"
            );
            deps.metrics.record_evaluation("blocking");
        } else {
            deps.metrics.record_evaluation("valid");
        }
    }

    /// Fetch the current user for a pass started with `user`.
    ///
    /// `None` aborts the pass, leaving the form as it was.
    async fn refetch(&self, epoch: u64, user: &Arc<User>) -> Option<Arc<User>> {
        let deps = &self.inner.deps;

        self.commit(epoch, |state| state.phase = GatePhase::Evaluating);
        let fetched = deps.api.fetch_current_user().await;

        let restore_phase = |state: &mut GateState| {
            state.phase = if state.open {
                GatePhase::Blocking
            } else {
                GatePhase::Idle
            };
        };

        let fresh = match fetched {
            Ok(Some(fresh)) => fresh,
            Ok(None) => {
                tracing::warn!(epoch, "current-user refetch returned no user; keeping gate state");
                self.commit(epoch, restore_phase);
                deps.metrics.record_evaluation("refetch_empty");
                return None;
            }
            Err(ApiError::Unauthorized) => {
                tracing::warn!(epoch, "session not authenticated during gate refetch");
                self.commit(epoch, restore_phase);
                deps.metrics.record_evaluation("refetch_unauthorized");
                deps.session.session_expired();
                return None;
            }
            Err(e) => {
                tracing::warn!(epoch, error = %e, "current-user refetch failed; keeping gate state");
                self.commit(epoch, restore_phase);
                deps.metrics.record_evaluation("refetch_failed");
                return None;
            }
        };

        match deps.users.get_current_user() {
            None => {
                if self.commit(epoch, GateState::reset) {
                    deps.metrics.record_evaluation("no_user");
                }
                None
            }
            Some(current) if !Arc::ptr_eq(&current, user) => {
                tracing::debug!(epoch, "user replaced during refetch; discarding pass");
                deps.metrics.record_evaluation("stale");
                None
            }
            Some(_) => Some(Arc::new(fresh)),
        }
    }

    /// Submit the completion form.
    ///
    /// An accepted update always ends the session: the server bumps the
    /// user's session version, so the gate closes the form, notifies, and
    /// schedules the forced logout whether or not every field is now valid.
    #[instrument(
        skip(self, form),
        fields(component = "profile-gate", operation = "handle_update", username = %form.username)
    )]
    pub async fn handle_update(&self, form: ProfileForm) -> UpdateOutcome {
        let deps = &self.inner.deps;

        if let Some(field_errors) = form.field_errors() {
            tracing::debug!(fields = ?field_errors.keys().collect::<Vec<_>>(), "profile form rejected client-side");
            deps.metrics.record_update("invalid_form");
            return UpdateOutcome {
                success: false,
                field_errors: Some(field_errors),
                message: Some(INVALID_FORM_MESSAGE.to_string()),
                ..Default::default()
            };
        }

        lock(&self.inner.state).phase = GatePhase::Submitting;

        let reply = match deps.api.update_profile(&form).await {
            Ok(reply) => reply,
            Err(e) => {
                let message = if e.is_unauthorized() {
                    SESSION_EXPIRED_MESSAGE
                } else {
                    UPDATE_FAILED_MESSAGE
                };
                tracing::error!(error = %e, "profile update request failed");
                self.back_to_form();
                deps.notifier.notify(Toast::error(message));
                deps.metrics.record_update("transport_error");
                if e.is_unauthorized() {
                    deps.session.session_expired();
                }
                return UpdateOutcome::failure(message);
            }
        };

        if !reply.is_success() {
            let body = reply.body;
            tracing::warn!(status = reply.status, message = ?body.message, "profile update rejected");
            {
                let mut state = lock(&self.inner.state);
                if let Some(fields) = &body.invalid_profile_fields {
                    state.invalid_fields = fields.clone();
                }
                if let Some(reasons) = &body.invalid_profile_reasons {
                    state.field_reasons = reasons.clone();
                }
                state.open = true;
                state.phase = GatePhase::Blocking;
            }
            deps.metrics.record_update("rejected");
            return UpdateOutcome {
                success: false,
                invalid_fields: body.invalid_profile_fields,
                field_errors: body.errors,
                message: body.message,
                invalid_profile_reasons: body.invalid_profile_reasons,
            };
        }

        let body = reply.body;
        // Top-level flags win; otherwise judge by the echoed user record.
        let reported = body
            .invalid_profile_fields
            .as_ref()
            .or(body.user.as_ref().map(|user| &user.invalid_profile_fields));
        let remaining: FieldFlags = reported
            .map(|flags| assessment::without_exempt_fields(flags, &self.inner.config.rules))
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, invalid)| *invalid)
            .collect();
        let remaining_reasons = body.invalid_profile_reasons.clone().or_else(|| {
            body.user
                .as_ref()
                .map(|user| user.invalid_profile_reasons.clone())
                .filter(|reasons| !reasons.is_empty())
        });
        let fully_resolved = remaining.is_empty();

        // Suppress before touching the store: the replacement below notifies
        // subscribers, and the session it belongs to is already invalid.
        self.inner.just_updated.store(true, Ordering::SeqCst);
        self.next_epoch();

        let current_data = match body.user {
            Some(user) => {
                let data = ProfileForm::from_user_or(&user, &form);
                deps.users.set_current_user(user);
                data
            }
            None => form,
        };

        {
            let mut state = lock(&self.inner.state);
            state.invalid_fields.clear();
            state.field_reasons.clear();
            state.current_data = Some(current_data);
            state.open = false;
            state.phase = GatePhase::Completed;
        }

        let toast = if fully_resolved {
            Toast::success(TOAST_FULLY_UPDATED)
        } else {
            Toast::warning(TOAST_PARTIALLY_UPDATED)
        };
        let message = toast.message.clone();
        deps.notifier.notify(toast);

        tracing::info!(fully_resolved, "profile updated; forcing logout");
        deps.metrics
            .record_update(if fully_resolved { "success" } else { "partial" });
        self.schedule_forced_logout(fully_resolved);

        UpdateOutcome {
            success: fully_resolved,
            invalid_fields: (!fully_resolved).then_some(remaining),
            field_errors: None,
            message: Some(message),
            invalid_profile_reasons: if fully_resolved {
                None
            } else {
                remaining_reasons
            },
        }
    }

    fn back_to_form(&self) {
        let mut state = lock(&self.inner.state);
        state.phase = if state.open {
            GatePhase::Blocking
        } else {
            GatePhase::Idle
        };
    }

    fn schedule_forced_logout(&self, fully_resolved: bool) {
        let gate = self.clone();
        let handle = tokio::spawn(async move { gate.forced_logout(fully_resolved).await });
        if let Some(previous) = lock(&self.inner.pending_logout).replace(handle) {
            previous.abort();
        }
    }

    async fn forced_logout(&self, fully_resolved: bool) {
        let deps = &self.inner.deps;
        let config = &self.inner.config;

        tokio::time::sleep(config.logout_delay).await;

        let logout = match deps.api.logout().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!(error = %e, "logout call failed; clearing local session anyway");
                "failed"
            }
        };

        deps.auth_session.clear_last_login_password();
        deps.users.clear_current_user();

        let message = if fully_resolved {
            LOGIN_MESSAGE_FULLY_UPDATED
        } else {
            LOGIN_MESSAGE_PARTIALLY_UPDATED
        };
        deps.navigator
            .redirect(&login_redirect(&config.login_route, message));
        deps.metrics.record_forced_logout(logout);

        // No user any more: resets the gate and lifts the suppression.
        self.evaluate().await;
    }

    /// Wait for a scheduled forced logout to finish, if one is pending.
    pub async fn wait_for_logout(&self) {
        let handle = lock(&self.inner.pending_logout).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("forced logout task failed: {}", e);
            }
        }
    }

    /// Re-evaluate on every user store change until the returned task is
    /// aborted.
    ///
    /// Each change gets its own pass so a slow refetch never delays the
    /// reaction to a newer user; the epoch check drops whichever pass loses.
    pub fn watch_user_store(&self) -> JoinHandle<()> {
        let gate = self.clone();
        let mut changes = self.inner.deps.users.subscribe();

        tokio::spawn(async move {
            let initial = gate.clone();
            tokio::spawn(async move { initial.evaluate().await });

            while changes.changed().await.is_ok() {
                let pass = gate.clone();
                tokio::spawn(async move { pass.evaluate().await });
            }
        })
    }
}

pub fn login_redirect(login_route: &str, message: &str) -> String {
    format!("{}?message={}", login_route, urlencoding::encode(message))
}
