use serde::Deserialize;

pub const MEMBER_DIR: &str = "fleet-console";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub gate: GateSettings,
    #[serde(default)]
    pub password_policy: PasswordPolicy,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    /// Dashboard API origin, e.g. `https://fleet.example.com`.
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_current_user_path")]
    pub current_user_path: String,
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_login_path() -> String {
    "/api/auth/login".to_string()
}

fn default_current_user_path() -> String {
    "/api/auth/current-user".to_string()
}

fn default_profile_path() -> String {
    "/api/profile".to_string()
}

fn default_logout_path() -> String {
    "/api/auth/logout".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl ApiSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            login_path: default_login_path(),
            current_user_path: default_current_user_path(),
            profile_path: default_profile_path(),
            logout_path: default_logout_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Behaviour of the profile validation gate.
#[derive(Debug, Deserialize, Clone)]
pub struct GateSettings {
    /// Roles that bypass profile validation entirely (matched case-insensitively).
    #[serde(default = "default_exempt_roles")]
    pub exempt_roles: Vec<String>,
    /// Fields never enforced on the client even when the server flags them.
    #[serde(default = "default_exempt_fields")]
    pub exempt_fields: Vec<String>,
    /// Pause between the success toast and the forced logout.
    #[serde(default = "default_logout_delay_ms")]
    pub logout_delay_ms: u64,
    /// Login screen the forced logout redirects to.
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

fn default_exempt_roles() -> Vec<String> {
    vec!["admin".to_string(), "developer".to_string()]
}

fn default_exempt_fields() -> Vec<String> {
    vec!["dateOfBirth".to_string(), "phoneNumber".to_string()]
}

fn default_logout_delay_ms() -> u64 {
    1500
}

fn default_login_route() -> String {
    "/login".to_string()
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            exempt_roles: default_exempt_roles(),
            exempt_fields: default_exempt_fields(),
            logout_delay_ms: default_logout_delay_ms(),
            login_route: default_login_route(),
        }
    }
}

/// Client-side copy of the password strength policy.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_true")]
    pub require_uppercase: bool,
    #[serde(default = "default_true")]
    pub require_lowercase: bool,
    #[serde(default = "default_true")]
    pub require_number: bool,
    #[serde(default = "default_true")]
    pub require_special: bool,
}

fn default_min_length() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            require_uppercase: true,
            require_lowercase: true,
            require_number: true,
            require_special: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC collector; spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_service_name() -> String {
    "fleet-console".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let configuration_directory = fleet_core::config::config_directory(MEMBER_DIR)?;
    fleet_core::config::load_settings(&configuration_directory)
}
