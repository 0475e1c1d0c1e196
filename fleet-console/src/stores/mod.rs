//! In-memory stores shared between the auth layer and the profile gate.
pub mod auth_session;
pub mod user_store;

pub use auth_session::AuthSessionStore;
pub use user_store::UserStore;
