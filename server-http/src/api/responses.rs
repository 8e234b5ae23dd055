use gatekeep::auth::{LogoutOutcome, PublicUser, TokenPair};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub message: String,
}

/// Response body for successful signup
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub user: PublicUser,
}

/// Response body for login and relogin
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Response body for logout
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    pub username: String,
}

impl From<LogoutOutcome> for LogoutResponse {
    fn from(outcome: LogoutOutcome) -> Self {
        Self {
            message: format!(
                "Logged out successfully. {} session(s) removed.",
                outcome.deleted
            ),
            username: outcome.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
