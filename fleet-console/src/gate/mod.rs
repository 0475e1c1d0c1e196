//! Profile validation gate.
//!
//! Keeps the console blocked behind a profile completion form while the
//! signed-in user's profile fails server-declared checks, and ends the
//! session once an update is accepted.
pub mod assessment;
pub mod controller;
pub mod state;

pub use assessment::{assess, Assessment, GateRules};
pub use controller::{login_redirect, GateConfig, GateDependencies, ProfileGate};
pub use state::{GatePhase, GateState, UpdateOutcome};
