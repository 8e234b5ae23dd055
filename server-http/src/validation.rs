use crate::api::{LoginRequest, SignupRequest};
use axum::extract::rejection::JsonRejection;

const MAX_USERNAME_LEN: usize = 255;

#[derive(Debug)]
pub enum ValidationError {
    EmptyField { field: &'static str },
    TooLong { field: &'static str, max: usize },
    MalformedBody(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' must not be empty", field)
            }
            ValidationError::TooLong { field, max } => {
                write!(f, "Field '{}' must be at most {} characters", field, max)
            }
            ValidationError::MalformedBody(reason) => {
                write!(f, "Malformed request body: {}", reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<JsonRejection> for ValidationError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedBody(rejection.body_text())
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "username" });
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::TooLong {
            field: "username",
            max: MAX_USERNAME_LEN,
        });
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField { field: "password" });
    }
    Ok(())
}

pub fn validate_signup(req: &SignupRequest) -> Result<(), ValidationError> {
    validate_username(&req.username)?;
    validate_password(&req.password)
}

/// Only emptiness is checked here; anything else is left to the
/// credential check so the response does not hint at which users exist.
pub fn validate_login(req: &LoginRequest) -> Result<(), ValidationError> {
    if req.username.is_empty() {
        return Err(ValidationError::EmptyField { field: "username" });
    }
    validate_password(&req.password)
}
