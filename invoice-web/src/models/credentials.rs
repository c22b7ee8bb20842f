//! Login form validation.
//!
//! A login attempt is checked for shape before anything is sent to the
//! authenticator. Each invalid field gets exactly one message; an empty
//! field always reports "required" rather than a format or length problem.

use secrecy::Secret;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrors};

pub const MIN_PASSWORD_LENGTH: u64 = 8;

pub const EMAIL_REQUIRED_MESSAGE: &str = "Please enter your email address.";
pub const EMAIL_INVALID_MESSAGE: &str = "Please enter a valid email address.";
pub const PASSWORD_REQUIRED_MESSAGE: &str = "Please enter your password.";
pub const PASSWORD_TOO_SHORT_MESSAGE: &str = "Password must be at least 8 characters.";

/// Shown above the form whenever a well-formed submission fails.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please check your email and password.";

const REQUIRED_CODE: &str = "required";

/// Raw form input. Missing fields deserialize as empty strings.
#[derive(Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(
        custom(function = "email_present"),
        email(code = "email", message = "Please enter a valid email address.")
    )]
    pub email: String,

    #[validate(
        custom(function = "password_present"),
        length(min = 8, code = "too_short", message = "Password must be at least 8 characters.")
    )]
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn email_present(email: &str) -> Result<(), ValidationError> {
    require(email, EMAIL_REQUIRED_MESSAGE)
}

fn password_present(password: &str) -> Result<(), ValidationError> {
    require(password, PASSWORD_REQUIRED_MESSAGE)
}

fn require(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        let mut error = ValidationError::new(REQUIRED_CODE);
        error.message = Some(Cow::Borrowed(message));
        return Err(error);
    }
    Ok(())
}

/// A login attempt that passed shape validation.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: Secret<String>,
}

impl LoginForm {
    /// Validate the form, consuming it into typed credentials.
    pub fn into_credentials(self) -> Result<Credentials, FieldErrors> {
        self.validate().map_err(|errors| FieldErrors::from(&errors))?;

        Ok(Credentials {
            email: self.email,
            password: Secret::new(self.password),
        })
    }
}

/// One message per invalid field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    messages: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.messages.get(field).map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.get("email")
    }

    pub fn password(&self) -> Option<&str> {
        self.get("password")
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let messages = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, field_errors)| {
                // "required" wins over format/length errors raised for the same empty value.
                let chosen = field_errors
                    .iter()
                    .find(|e| e.code == REQUIRED_CODE)
                    .or_else(|| field_errors.first())?;
                let message = chosen
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field));
                Some((field.to_string(), message))
            })
            .collect();

        Self { messages }
    }
}
