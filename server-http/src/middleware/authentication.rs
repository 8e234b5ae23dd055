use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Extract the token from an `Authorization: Bearer <token>` header value
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let mut parts = auth_header.split_whitespace();

    let scheme = parts.next()?;
    let token = parts.next()?;
    if !scheme.eq_ignore_ascii_case("Bearer") || parts.next().is_some() {
        return None;
    }

    Some(token)
}

/// Authentication middleware
///
/// Resolves the access token to its user and attaches the `PublicUser` to the
/// request extensions. Tokens that were superseded by a later login or a
/// relogin are rejected even if they have not expired yet.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let access_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or(ApiError::MissingHeader("Authorization"))?
        .to_string();

    let user = state.auth_service.resolve_current_user(&access_token).await?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
