//! Pure decision logic of the profile gate.
//!
//! Nothing here touches the network or the stores; the controller feeds in
//! the resolved user and the cached login password and applies the result.

use crate::config::{GateSettings, PasswordPolicy};
use crate::models::{FieldFlags, FieldReasons, ProfileForm, User};
use crate::services::password_policy::check_strength;

pub const PASSWORD_FIELD: &str = "password";

/// Exemption rules applied on top of the server's flags.
#[derive(Debug, Clone)]
pub struct GateRules {
    pub exempt_roles: Vec<String>,
    pub exempt_fields: Vec<String>,
    pub password_policy: PasswordPolicy,
}

impl GateRules {
    pub fn from_settings(gate: &GateSettings, password_policy: &PasswordPolicy) -> Self {
        Self {
            exempt_roles: gate.exempt_roles.clone(),
            exempt_fields: gate.exempt_fields.clone(),
            password_policy: password_policy.clone(),
        }
    }
}

impl Default for GateRules {
    fn default() -> Self {
        Self::from_settings(&GateSettings::default(), &PasswordPolicy::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub needs_update: bool,
    pub invalid_fields: FieldFlags,
    pub field_reasons: FieldReasons,
    pub current_data: ProfileForm,
    /// The cached login password passed the strength check and cleared the
    /// `password` flag; the cache must now be discarded.
    pub password_revalidated: bool,
}

pub fn is_role_exempt(user: &User, rules: &GateRules) -> bool {
    user.has_any_role(&rules.exempt_roles)
}

/// Refetch only when the server already hinted at a problem.
pub fn should_refetch(user: &User) -> bool {
    user.requires_profile_update || user.has_invalid_fields()
}

/// Drop client-exempt fields from a set of server flags.
pub fn without_exempt_fields(flags: &FieldFlags, rules: &GateRules) -> FieldFlags {
    flags
        .iter()
        .filter(|(field, _)| !rules.exempt_fields.contains(field))
        .map(|(field, invalid)| (field.clone(), *invalid))
        .collect()
}

/// Decide whether `user` must complete the profile form.
pub fn assess(user: &User, cached_password: Option<&str>, rules: &GateRules) -> Assessment {
    let mut invalid_fields = user.invalid_profile_fields.clone();
    let mut field_reasons = user.invalid_profile_reasons.clone();
    let mut password_revalidated = false;

    if invalid_fields.get(PASSWORD_FIELD).copied().unwrap_or(false) {
        if let Some(password) = cached_password {
            let strength = check_strength(password, &rules.password_policy);
            if strength.is_valid {
                invalid_fields.remove(PASSWORD_FIELD);
                field_reasons.remove(PASSWORD_FIELD);
                password_revalidated = true;
            } else {
                field_reasons.insert(PASSWORD_FIELD.to_string(), strength.reason());
            }
        }
    }

    for field in &rules.exempt_fields {
        invalid_fields.remove(field);
        field_reasons.remove(field);
    }

    let needs_update = invalid_fields.values().any(|invalid| *invalid);
    if !needs_update {
        invalid_fields.clear();
        field_reasons.clear();
    }

    Assessment {
        needs_update,
        invalid_fields,
        field_reasons,
        current_data: ProfileForm::from_user(user),
        password_revalidated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flagged(fields: &[(&str, bool)]) -> User {
        User {
            username: Some("jdoe".into()),
            requires_profile_update: true,
            invalid_profile_fields: fields
                .iter()
                .map(|(field, invalid)| (field.to_string(), *invalid))
                .collect(),
            invalid_profile_reasons: fields
                .iter()
                .map(|(field, _)| (field.to_string(), format!("{} is invalid", field)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn exempt_fields_alone_never_block() {
        let rules = GateRules::default();
        for fields in [
            vec![("dateOfBirth", true)],
            vec![("phoneNumber", true)],
            vec![("dateOfBirth", true), ("phoneNumber", true)],
        ] {
            let assessment = assess(&flagged(&fields), None, &rules);
            assert!(!assessment.needs_update);
            assert!(assessment.invalid_fields.is_empty());
            assert!(assessment.field_reasons.is_empty());
        }
    }

    #[test]
    fn exempt_fields_are_stripped_next_to_real_ones() {
        let user = flagged(&[("firstName", true), ("phoneNumber", true)]);
        let assessment = assess(&user, None, &GateRules::default());
        assert!(assessment.needs_update);
        assert_eq!(assessment.invalid_fields.len(), 1);
        assert_eq!(assessment.field_reasons["firstName"], "firstName is invalid");
    }

    #[test]
    fn strong_cached_password_clears_password_flag() {
        let user = flagged(&[("password", true)]);
        let assessment = assess(&user, Some("Str0ng!Pass"), &GateRules::default());
        assert!(assessment.password_revalidated);
        assert!(!assessment.needs_update);
        assert!(!assessment.invalid_fields.contains_key(PASSWORD_FIELD));
    }

    #[test]
    fn weak_cached_password_explains_itself() {
        let user = flagged(&[("password", true)]);
        let assessment = assess(&user, Some("weak"), &GateRules::default());
        assert!(!assessment.password_revalidated);
        assert!(assessment.needs_update);
        assert!(assessment.field_reasons[PASSWORD_FIELD].contains("at least 8 characters"));
    }

    #[test]
    fn password_without_cache_keeps_server_reason() {
        let user = flagged(&[("password", true)]);
        let assessment = assess(&user, None, &GateRules::default());
        assert!(assessment.needs_update);
        assert_eq!(assessment.field_reasons[PASSWORD_FIELD], "password is invalid");
    }

    #[test]
    fn refetch_only_for_flagged_users() {
        assert!(!should_refetch(&User::default()));
        assert!(should_refetch(&flagged(&[("firstName", true)])));

        let mut stale_flag = flagged(&[("firstName", false)]);
        assert!(should_refetch(&stale_flag));
        stale_flag.requires_profile_update = false;
        assert!(!should_refetch(&stale_flag));
    }

    #[test]
    fn exempt_roles_match_case_insensitively() {
        let rules = GateRules::default();
        let mut user = flagged(&[("firstName", true)]);
        user.roles = ["ADMIN".to_string()].into_iter().collect();
        assert!(is_role_exempt(&user, &rules));
        user.roles = ["collector".to_string()].into_iter().collect();
        assert!(!is_role_exempt(&user, &rules));
    }

    #[test]
    fn current_data_is_filled_even_when_valid() {
        let mut user = flagged(&[]);
        user.first_name = Some("Jane".into());
        let assessment = assess(&user, None, &GateRules::default());
        assert!(!assessment.needs_update);
        assert_eq!(assessment.current_data.first_name, "Jane");
    }
}
