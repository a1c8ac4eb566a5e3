//! System handlers: liveness, health, OpenAPI

use axum::{Json, response::IntoResponse};
use serde_json::json;

/// GET / and HEAD / - liveness payload for uptime monitors
///
/// axum serves HEAD through the same GET handler with the body stripped,
/// which is exactly what pollers expect.
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service is up")
    )
)]
pub async fn liveness() -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "message": "media relay is up"
    }))
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
