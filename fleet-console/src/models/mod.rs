pub mod profile;
pub mod user;

pub use profile::{
    CurrentUserEnvelope, FieldErrors, ProfileForm, ProfileUpdateReply, ProfileUpdateResponse,
};
pub use user::{EntityId, FieldFlags, FieldReasons, User};
