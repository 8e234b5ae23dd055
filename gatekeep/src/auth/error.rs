use thiserror::Error;

use super::token::TokenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid admin password")]
    InvalidAdminSecret,

    #[error("Username already exists")]
    UserAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(TokenError),

    #[error("Unknown user")]
    UnknownUser,

    #[error("Session not found")]
    SessionNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Session has been revoked or superseded")]
    SessionRevoked,

    #[error("Storage error: {0}")]
    Store(#[from] shared::Error),

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),

    #[error("Token encoding error: {0}")]
    TokenEncoding(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(reason) => AuthError::TokenEncoding(reason),
            other => AuthError::InvalidToken(other),
        }
    }
}

/// Coarse failure category, mapped to a status code by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidCredentials,
    Unauthorized,
    Forbidden,
    Conflict,
    NotFound,
    Internal,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AuthError::InvalidAdminSecret
            | AuthError::InvalidToken(_)
            | AuthError::SessionRevoked => ErrorKind::Unauthorized,
            AuthError::UnknownUser => ErrorKind::Forbidden,
            AuthError::UserAlreadyExists => ErrorKind::Conflict,
            AuthError::SessionNotFound | AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::Store(_) | AuthError::PasswordHashError(_) | AuthError::TokenEncoding(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}
