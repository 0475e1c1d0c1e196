use crate::models::{FieldErrors, FieldFlags, FieldReasons, ProfileForm};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    /// No user, a valid user, or an exempt role.
    #[default]
    Idle,
    /// Waiting for the current-user refetch. The form keeps whatever
    /// visibility it had before.
    Evaluating,
    /// Form open, waiting for corrected values.
    Blocking,
    /// Profile update in flight.
    Submitting,
    /// Update accepted; the forced logout is under way.
    Completed,
}

/// What the UI renders from the gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateState {
    pub phase: GatePhase,
    pub open: bool,
    pub invalid_fields: FieldFlags,
    pub field_reasons: FieldReasons,
    pub current_data: Option<ProfileForm>,
}

impl GateState {
    pub fn reset(&mut self) {
        *self = GateState::default();
    }

    /// Fields still flagged invalid, in name order.
    pub fn blocking_fields(&self) -> Vec<&str> {
        self.invalid_fields
            .iter()
            .filter(|(_, invalid)| **invalid)
            .map(|(field, _)| field.as_str())
            .collect()
    }
}

/// Result of submitting the completion form.
///
/// `success` is true only when the update left no invalid field behind; an
/// accepted update with remaining fields still reports `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_fields: Option<FieldFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_profile_reasons: Option<FieldReasons>,
}

impl UpdateOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }
}
