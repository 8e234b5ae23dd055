use axum::Json;

use crate::api::HealthResponse;

/// GET /
pub async fn root() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "success".into(),
    })
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "OK".into(),
    })
}
