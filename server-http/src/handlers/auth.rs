use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Extension, Json,
};
use gatekeep::auth::PublicUser;

use crate::api::{LoginRequest, LogoutResponse, SignupRequest, SignupResponse, TokenResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{validate_login, validate_signup, ValidationError};

/// Header carrying the refresh token for relogin and logout.
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

fn refresh_token_from(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingHeader(REFRESH_TOKEN_HEADER))
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<SignupResponse>, ApiError> {
    let Json(req) = body.map_err(ValidationError::from)?;
    validate_signup(&req)?;

    let user = state
        .auth_service
        .signup(&req.admin_password, &req.username, &req.password, req.role)
        .await?;

    Ok(Json(SignupResponse {
        success: true,
        user,
    }))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(req) = body.map_err(ValidationError::from)?;
    validate_login(&req)?;

    let tokens = state
        .auth_service
        .login(&req.username, &req.password)
        .await?;

    Ok(Json(tokens.into()))
}

/// POST /auth/relogin
///
/// Rotates the session's token pair. The presented refresh token is
/// single-use: a second call with it fails with 404.
pub async fn relogin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let refresh_token = refresh_token_from(&headers)?;
    let tokens = state.auth_service.relogin(refresh_token).await?;

    Ok(Json(tokens.into()))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    let refresh_token = refresh_token_from(&headers)?;
    let outcome = state.auth_service.logout(refresh_token).await?;

    Ok(Json(outcome.into()))
}

/// GET /auth/me
pub async fn me(Extension(user): Extension<PublicUser>) -> Json<PublicUser> {
    Json(user)
}
