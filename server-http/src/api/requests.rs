use gatekeep::auth::Role;
use serde::Deserialize;

/// Request body for POST /auth/signup
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Shared secret gating account creation
    pub admin_password: String,
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Request body for POST /auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}
