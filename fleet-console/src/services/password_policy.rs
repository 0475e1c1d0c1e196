//! Client-side password strength check.
//!
//! Mirrors the server's policy closely enough to decide whether a password
//! the server flagged as weak actually still fails, without another round
//! trip.

use crate::config::PasswordPolicy;
use serde::Serialize;
use std::fmt;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*()-_=+[]{}|\\;:'\",.<>/?`~";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    TooShort { min_length: usize, actual_length: usize },
    MissingUppercase,
    MissingLowercase,
    MissingNumber,
    MissingSpecial,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::TooShort {
                min_length,
                actual_length,
            } => write!(
                f,
                "Password must be at least {} characters (got {})",
                min_length, actual_length
            ),
            PolicyViolation::MissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PolicyViolation::MissingLowercase => {
                write!(f, "Password must contain at least one lowercase letter")
            }
            PolicyViolation::MissingNumber => {
                write!(f, "Password must contain at least one number")
            }
            PolicyViolation::MissingSpecial => {
                write!(f, "Password must contain at least one special character")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStrength {
    pub is_valid: bool,
    pub feedback: Vec<String>,
}

impl PasswordStrength {
    /// Feedback joined into a single reason line.
    pub fn reason(&self) -> String {
        self.feedback.join(". ")
    }
}

/// Every rule the password breaks, in policy order.
pub fn violations(password: &str, policy: &PasswordPolicy) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();

    let length = password.chars().count();
    if length < policy.min_length {
        violations.push(PolicyViolation::TooShort {
            min_length: policy.min_length,
            actual_length: length,
        });
    }
    if policy.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        violations.push(PolicyViolation::MissingUppercase);
    }
    if policy.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        violations.push(PolicyViolation::MissingLowercase);
    }
    if policy.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PolicyViolation::MissingNumber);
    }
    if policy.require_special && !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        violations.push(PolicyViolation::MissingSpecial);
    }

    violations
}

pub fn check_strength(password: &str, policy: &PasswordPolicy) -> PasswordStrength {
    let feedback: Vec<String> = violations(password, policy)
        .iter()
        .map(ToString::to_string)
        .collect();

    PasswordStrength {
        is_valid: feedback.is_empty(),
        feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient_policy() -> PasswordPolicy {
        PasswordPolicy {
            min_length: 1,
            require_uppercase: false,
            require_lowercase: false,
            require_number: false,
            require_special: false,
        }
    }

    #[test]
    fn strong_password_passes() {
        let result = check_strength("Str0ng!Pass", &PasswordPolicy::default());
        assert!(result.is_valid);
        assert!(result.feedback.is_empty());
    }

    #[test]
    fn weak_password_lists_every_violation() {
        let result = check_strength("short", &PasswordPolicy::default());
        assert!(!result.is_valid);
        // too short, uppercase, number, special
        assert_eq!(result.feedback.len(), 4);
        assert!(result.feedback[0].starts_with("Password must be at least 8 characters"));
    }

    #[test]
    fn missing_special_only() {
        let found = violations("LongEnough1", &PasswordPolicy::default());
        assert_eq!(found, vec![PolicyViolation::MissingSpecial]);
    }

    #[test]
    fn lenient_policy_accepts_anything_non_empty() {
        assert!(check_strength("x", &lenient_policy()).is_valid);
    }

    #[test]
    fn reason_joins_feedback() {
        let result = check_strength("ALLUPPER1!", &PasswordPolicy::default());
        assert_eq!(
            result.reason(),
            "Password must contain at least one lowercase letter"
        );
    }
}
