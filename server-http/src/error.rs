use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gatekeep::auth::{AuthError, ErrorKind};

use crate::api::ErrorResponse;
use crate::validation::ValidationError;

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Validation(ValidationError),
    /// A required request header was absent or not valid UTF-8.
    MissingHeader(&'static str),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidCredentials => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => status_for(err.kind()),
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingHeader(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Auth(AuthError::InvalidToken(_)) => {
                "Could not validate credentials".to_string()
            }
            ApiError::Auth(err) if err.is_internal() => "Internal server error".to_string(),
            ApiError::Auth(err) => err.to_string(),
            ApiError::Validation(err) => err.to_string(),
            ApiError::MissingHeader(name) => format!("Missing {} header", name),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Auth(err) if err.is_internal() => {
                tracing::error!("Request failed: {}", err);
            }
            ApiError::Auth(AuthError::InvalidToken(cause)) => {
                tracing::debug!("Token rejected: {}", cause);
            }
            _ => {}
        }

        let body = Json(ErrorResponse {
            error: self.message(),
        });

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
