use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::domain::policy::ConsoleRole;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MIN_ADMIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    EmailFormat,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Admin passwords must be at least 8 characters")]
    AdminPasswordTooShort,
    #[error("Name is required")]
    NameRequired,
    #[error("Please select a valid role")]
    UnknownRole,
    #[error("Amount must be greater than 0")]
    AmountNotPositive,
    #[error("Amount is out of range")]
    AmountOutOfRange,
    #[error("Minimum top-up amount is 10 zł")]
    TopUpBelowMinimum,
    #[error("Maximum top-up amount is 1000 zł")]
    TopUpAboveMaximum,
    #[error("Insufficient balance")]
    InsufficientBalance,
}

/// Outcome of a single-value check in the shape form handlers consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<(), ValidationError>> for ValidationResult {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => Self {
                is_valid: true,
                error: None,
            },
            Err(error) => Self {
                is_valid: false,
                error: Some(error.to_string()),
            },
        }
    }
}

/// Per-field outcome of a multi-field form.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValidation {
    pub is_valid: bool,
    pub errors: BTreeMap<&'static str, String>,
}

impl FormValidation {
    fn from_checks(
        checks: impl IntoIterator<Item = (&'static str, Result<(), ValidationError>)>,
    ) -> Self {
        let errors: BTreeMap<&'static str, String> = checks
            .into_iter()
            .filter_map(|(field, result)| result.err().map(|error| (field, error.to_string())))
            .collect();

        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }

    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::EmailFormat);
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }

    let length = password.chars().count();
    if length < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }

    // Matches on the password text itself, not on the account role.
    if length < MIN_ADMIN_PASSWORD_CHARS && password.contains("admin") {
        return Err(ValidationError::AdminPasswordTooShort);
    }

    Ok(())
}

pub fn validate_login_form(email: &str, password: &str) -> FormValidation {
    FormValidation::from_checks([
        ("email", validate_email(email)),
        ("password", validate_password(password)),
    ])
}

pub fn validate_create_user_form(
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> FormValidation {
    let name_check = if name.trim().is_empty() {
        Err(ValidationError::NameRequired)
    } else {
        Ok(())
    };
    let role_check = role
        .parse::<ConsoleRole>()
        .map(|_| ())
        .map_err(|_| ValidationError::UnknownRole);

    FormValidation::from_checks([
        ("name", name_check),
        ("email", validate_email(email)),
        ("password", validate_password(password)),
        ("role", role_check),
    ])
}
