pub mod config;
pub mod errors;
pub mod gate;
pub mod models;
pub mod services;
pub mod session;
pub mod stores;

use gate::{GateConfig, GateDependencies, ProfileGate};
use services::notifier::{RecordingNavigator, TracingNotifier};
use services::{ApiClient, GateMetrics};
use session::Session;
use std::sync::Arc;
use stores::{AuthSessionStore, UserStore};

/// Everything the console wires together at startup.
pub struct Console {
    pub api: Arc<ApiClient>,
    pub users: Arc<UserStore>,
    pub auth_session: Arc<AuthSessionStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub session: Arc<Session>,
    pub gate: ProfileGate,
}

impl Console {
    pub fn build(settings: &config::Settings) -> anyhow::Result<Self> {
        let api = Arc::new(ApiClient::new(settings.api.clone())?);
        let users = Arc::new(UserStore::new());
        let auth_session = Arc::new(AuthSessionStore::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let session = Arc::new(Session::new(api.clone(), users.clone(), auth_session.clone()));

        let gate = ProfileGate::new(
            GateDependencies {
                api: api.clone(),
                users: users.clone(),
                auth_session: auth_session.clone(),
                notifier: Arc::new(TracingNotifier),
                navigator: navigator.clone(),
                session: session.clone(),
                metrics: GateMetrics::new()?,
            },
            GateConfig::from_settings(&settings.gate, &settings.password_policy),
        );

        Ok(Self {
            api,
            users,
            auth_session,
            navigator,
            session,
            gate,
        })
    }
}
