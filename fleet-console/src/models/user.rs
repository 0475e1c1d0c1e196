use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Per-field validity flags as reported by the API (`true` = invalid).
pub type FieldFlags = BTreeMap<String, bool>;

/// Per-field human readable reasons.
pub type FieldReasons = BTreeMap<String, String>;

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Licensee and location IDs arrive as strings or numbers depending on the
/// record's age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Text(String),
    Number(i64),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Text(value) => f.write_str(value),
            EntityId::Number(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: Option<String>,
    pub town: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identification {
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    pub notes: Option<String>,
}

/// The authenticated dashboard user as served by the auth API.
///
/// Only the subset the profile gate reads or writes is modelled; unknown
/// fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// Document key. Servers that also serialize virtuals send a matching
    /// `id` alongside it.
    #[serde(rename = "_id", deserialize_with = "null_as_default", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: Option<String>,
    pub email_address: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub roles: BTreeSet<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub other_name: Option<String>,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<Address>,
    pub identification: Option<Identification>,

    #[serde(deserialize_with = "null_as_default")]
    pub requires_profile_update: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub invalid_profile_fields: FieldFlags,
    #[serde(deserialize_with = "null_as_default")]
    pub invalid_profile_reasons: FieldReasons,

    pub assigned_licensees: Option<Vec<EntityId>>,
    pub assigned_locations: Option<Vec<EntityId>>,

    #[serde(deserialize_with = "null_as_default")]
    pub session_version: i64,
}

impl User {
    /// Case-insensitive role membership.
    pub fn has_any_role<'a, I>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        candidates.into_iter().any(|candidate| {
            self.roles
                .iter()
                .any(|role| role.eq_ignore_ascii_case(candidate))
        })
    }

    /// True when the server flagged at least one field as invalid.
    pub fn has_invalid_fields(&self) -> bool {
        self.invalid_profile_fields.values().any(|invalid| *invalid)
    }

    /// The record key, whichever of `id` / `_id` the server sent.
    pub fn record_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.object_id.as_deref())
    }

    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email_address.as_deref())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_with_mixed_ids() {
        let user: User = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "username": "jdoe",
            "emailAddress": "jdoe@example.com",
            "roles": ["Manager"],
            "requiresProfileUpdate": true,
            "invalidProfileFields": { "firstName": true, "gender": false },
            "invalidProfileReasons": { "firstName": "First name is required" },
            "assignedLicensees": ["lic-1", 42],
            "sessionVersion": 3,
            "identification": null,
            "someUnknownField": "ignored"
        }))
        .unwrap();

        assert_eq!(user.record_id(), Some("u1"));
        assert!(user.requires_profile_update);
        assert!(user.has_invalid_fields());
        assert_eq!(
            user.assigned_licensees,
            Some(vec![EntityId::Text("lic-1".into()), EntityId::Number(42)])
        );
        assert_eq!(user.assigned_locations, None);
        assert_eq!(user.session_version, 3);
    }

    #[test]
    fn explicit_nulls_fall_back_to_defaults() {
        let user: User = serde_json::from_value(serde_json::json!({
            "username": "jdoe",
            "requiresProfileUpdate": null,
            "sessionVersion": null,
            "roles": null,
            "invalidProfileFields": null,
            "_id": null
        }))
        .unwrap();

        assert!(!user.requires_profile_update);
        assert_eq!(user.session_version, 0);
        assert!(user.roles.is_empty());
        assert!(!user.has_invalid_fields());
        assert_eq!(user.record_id(), None);
    }

    #[test]
    fn accepts_both_id_keys() {
        let user: User = serde_json::from_value(serde_json::json!({
            "_id": "64f1",
            "id": "64f1",
            "username": "jdoe"
        }))
        .unwrap();

        assert_eq!(user.object_id.as_deref(), Some("64f1"));
        assert_eq!(user.id.as_deref(), Some("64f1"));
        assert_eq!(user.record_id(), Some("64f1"));
    }

    #[test]
    fn role_match_ignores_case() {
        let user = User {
            roles: ["Developer".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let exempt = vec!["admin".to_string(), "developer".to_string()];
        assert!(user.has_any_role(&exempt));
        assert!(!user.has_any_role(&vec!["collector".to_string()]));
    }

    #[test]
    fn all_false_flags_are_not_invalid() {
        let user = User {
            invalid_profile_fields: [("firstName".to_string(), false)].into_iter().collect(),
            ..Default::default()
        };
        assert!(!user.has_invalid_fields());
    }
}
