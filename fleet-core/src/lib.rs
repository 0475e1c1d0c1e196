//! fleet-core: shared infrastructure for the fleet console crates.
pub mod config;
pub mod error;
pub mod observability;

pub use reqwest;
pub use tracing;
