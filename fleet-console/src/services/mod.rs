pub mod api_client;
pub mod metrics;
pub mod notifier;
pub mod password_policy;

pub use api_client::{ApiClient, ProfileApi};
pub use metrics::GateMetrics;
pub use notifier::{Navigator, Notifier, Toast, ToastKind};
pub use password_policy::{check_strength, PasswordStrength};
