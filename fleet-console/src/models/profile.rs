use super::user::{EntityId, FieldFlags, FieldReasons, User};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};

/// Field name → message, the shape the API uses for `errors`.
pub type FieldErrors = BTreeMap<String, String>;

pub const GENDERS: [&str; 3] = ["male", "female", "other"];

/// Values shown in the profile completion form.
///
/// Serializes to exactly the body of `PUT /api/profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(length(min = 1, max = 50, message = "First name is required (max 50 characters)"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required (max 50 characters)"))]
    pub last_name: String,
    #[validate(length(max = 50, message = "Other name must be at most 50 characters"))]
    pub other_name: String,
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,
    #[validate(email(message = "Invalid email format"))]
    pub email_address: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(custom(function = "validate_date_of_birth"))]
    pub date_of_birth: String,
    pub licensee_ids: Vec<String>,
    pub location_ids: Vec<String>,
}

impl ProfileForm {
    /// Prefill values from a user record.
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone().unwrap_or_default(),
            first_name: user.first_name.clone().unwrap_or_default(),
            last_name: user.last_name.clone().unwrap_or_default(),
            other_name: user.other_name.clone().unwrap_or_default(),
            gender: normalize_gender(user.gender.as_deref()),
            email_address: user.email_address.clone().unwrap_or_default(),
            phone: user.phone_number.clone().unwrap_or_default(),
            date_of_birth: normalize_date_of_birth(user.date_of_birth.as_deref()),
            licensee_ids: id_strings(user.assigned_licensees.as_deref()),
            location_ids: id_strings(user.assigned_locations.as_deref()),
        }
    }

    /// Prefill from the user the server echoed back after an update, keeping
    /// the submitted value for anything the server left out.
    pub fn from_user_or(user: &User, submitted: &ProfileForm) -> Self {
        let pick = |value: &Option<String>, fallback: &String| {
            value.clone().unwrap_or_else(|| fallback.clone())
        };

        Self {
            username: pick(&user.username, &submitted.username),
            first_name: pick(&user.first_name, &submitted.first_name),
            last_name: pick(&user.last_name, &submitted.last_name),
            other_name: pick(&user.other_name, &submitted.other_name),
            gender: match user.gender.as_deref() {
                Some(gender) => normalize_gender(Some(gender)),
                None => submitted.gender.clone(),
            },
            email_address: pick(&user.email_address, &submitted.email_address),
            phone: pick(&user.phone_number, &submitted.phone),
            date_of_birth: match user.date_of_birth.as_deref() {
                Some(dob) => normalize_date_of_birth(Some(dob)),
                None => submitted.date_of_birth.clone(),
            },
            licensee_ids: match user.assigned_licensees.as_deref() {
                Some(ids) => id_strings(Some(ids)),
                None => submitted.licensee_ids.clone(),
            },
            location_ids: match user.assigned_locations.as_deref() {
                Some(ids) => id_strings(Some(ids)),
                None => submitted.location_ids.clone(),
            },
        }
    }

    /// Run client-side validation, keyed by the API's camelCase field names.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self.validate() {
            Ok(()) => None,
            Err(errors) => Some(flatten_errors(&errors)),
        }
    }
}

pub fn normalize_gender(gender: Option<&str>) -> String {
    gender.map(|g| g.trim().to_lowercase()).unwrap_or_default()
}

/// Reduce a stored date of birth to `YYYY-MM-DD`.
///
/// Accepts RFC 3339 timestamps and plain dates. Anything unparseable becomes
/// an empty string so the form starts blank rather than with garbage.
pub fn normalize_date_of_birth(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return String::new();
    };

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return timestamp.with_timezone(&Utc).format("%Y-%m-%d").to_string();
    }

    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn id_strings(ids: Option<&[EntityId]>) -> Vec<String> {
    ids.map(|ids| ids.iter().map(ToString::to_string).collect())
        .unwrap_or_default()
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

fn validate_gender(value: &str) -> Result<(), ValidationError> {
    if GENDERS.contains(&value) {
        Ok(())
    } else {
        Err(validation_error("gender", "Select a gender"))
    }
}

fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    let body = value.strip_prefix('+').unwrap_or(value);
    let digit_count = body.chars().filter(char::is_ascii_digit).count();
    let valid = (7..=15).contains(&digit_count)
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(validation_error("phone", "Phone number must contain 7 to 15 digits"))
    }
}

fn validate_date_of_birth(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) if date <= Utc::now().date_naive() => Ok(()),
        Ok(_) => Err(validation_error(
            "date_of_birth",
            "Date of birth cannot be in the future",
        )),
        Err(_) => Err(validation_error(
            "date_of_birth",
            "Date of birth must use YYYY-MM-DD",
        )),
    }
}

fn flatten_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errors)| {
            let field: &str = &field;
            errors.first().map(|error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                (camel_case(field), message)
            })
        })
        .collect()
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Body of `PUT /api/profile` responses, successful or not.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdateResponse {
    pub success: bool,
    pub user: Option<User>,
    pub invalid_profile_fields: Option<FieldFlags>,
    pub invalid_profile_reasons: Option<FieldReasons>,
    pub errors: Option<FieldErrors>,
    pub message: Option<String>,
    pub requires_profile_update: Option<bool>,
}

/// Raw outcome of the profile PUT: HTTP status plus decoded body.
#[derive(Debug, Clone)]
pub struct ProfileUpdateReply {
    pub status: u16,
    pub body: ProfileUpdateResponse,
}

impl ProfileUpdateReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.body.success
    }
}

/// Body of the current-user endpoint.
///
/// Both `{ "data": { "user": .. } }` and a bare `{ "user": .. }` are
/// accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentUserEnvelope {
    pub data: Option<CurrentUserData>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentUserData {
    pub user: Option<User>,
}

impl CurrentUserEnvelope {
    pub fn into_user(self) -> Option<User> {
        self.data.and_then(|data| data.user).or(self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> ProfileForm {
        ProfileForm {
            username: "jdoe".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            gender: "female".into(),
            email_address: "jane@example.com".into(),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_dates() {
        assert_eq!(
            normalize_date_of_birth(Some("1990-05-01T00:00:00.000Z")),
            "1990-05-01"
        );
        assert_eq!(normalize_date_of_birth(Some("1990-05-01")), "1990-05-01");
        assert_eq!(normalize_date_of_birth(Some("yesterday")), "");
        assert_eq!(normalize_date_of_birth(None), "");
    }

    #[test]
    fn prefill_normalizes_user_values() {
        let user = User {
            username: Some("jdoe".into()),
            gender: Some("Female".into()),
            date_of_birth: Some("1985-12-24T10:00:00Z".into()),
            assigned_licensees: Some(vec![EntityId::Number(7), EntityId::Text("lic-9".into())]),
            assigned_locations: Some(vec![]),
            ..Default::default()
        };

        let form = ProfileForm::from_user(&user);
        assert_eq!(form.gender, "female");
        assert_eq!(form.date_of_birth, "1985-12-24");
        assert_eq!(form.licensee_ids, vec!["7".to_string(), "lic-9".to_string()]);
        assert!(form.location_ids.is_empty());
        assert_eq!(form.first_name, "");
    }

    #[test]
    fn echoed_user_falls_back_to_submitted_values() {
        let submitted = ProfileForm {
            first_name: "Alice".into(),
            licensee_ids: vec!["1".into()],
            ..valid_form()
        };
        let echoed = User {
            username: Some("jdoe".into()),
            last_name: Some("Smith".into()),
            ..Default::default()
        };

        let form = ProfileForm::from_user_or(&echoed, &submitted);
        assert_eq!(form.first_name, "Alice");
        assert_eq!(form.last_name, "Smith");
        assert_eq!(form.licensee_ids, vec!["1".to_string()]);
    }

    #[test]
    fn serializes_to_profile_put_body() {
        let body = serde_json::to_value(valid_form()).unwrap();
        assert_eq!(body["firstName"], "Jane");
        assert_eq!(body["emailAddress"], "jane@example.com");
        assert_eq!(body["licenseeIds"], serde_json::json!([]));
        assert!(body.get("phone").is_some());
    }

    #[test]
    fn valid_form_has_no_errors() {
        assert_eq!(valid_form().field_errors(), None);
    }

    #[test]
    fn invalid_form_reports_camel_case_fields() {
        let form = ProfileForm {
            first_name: String::new(),
            gender: "unknown".into(),
            email_address: "not-an-email".into(),
            date_of_birth: "01/02/1990".into(),
            ..valid_form()
        };

        let errors = form.field_errors().unwrap();
        assert!(errors.contains_key("firstName"));
        assert!(errors.contains_key("gender"));
        assert!(errors.contains_key("emailAddress"));
        assert_eq!(errors["dateOfBirth"], "Date of birth must use YYYY-MM-DD");
    }

    #[test]
    fn phone_is_optional_but_checked() {
        let mut form = valid_form();
        form.phone = "+44 20 7946 0958".into();
        assert_eq!(form.field_errors(), None);
        form.phone = "call me".into();
        assert!(form.field_errors().unwrap().contains_key("phone"));
    }

    #[test]
    fn envelope_accepts_both_shapes() {
        let wrapped: CurrentUserEnvelope =
            serde_json::from_str(r#"{"data":{"user":{"username":"a"}}}"#).unwrap();
        assert_eq!(wrapped.into_user().unwrap().username.as_deref(), Some("a"));

        let bare: CurrentUserEnvelope = serde_json::from_str(r#"{"user":{"username":"b"}}"#).unwrap();
        assert_eq!(bare.into_user().unwrap().username.as_deref(), Some("b"));

        let empty: CurrentUserEnvelope = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(empty.into_user().is_none());
    }
}
