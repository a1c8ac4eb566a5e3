//! REST API server module
//!
//! The thin HTTP shell around the relay: one working endpoint
//! (`POST /upload`), liveness/health endpoints for uptime monitors, and
//! the OpenAPI description.

use crate::{Config, Relay, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// - `POST /upload` - Relay a remote media file into a chat
/// - `GET|HEAD /` - Liveness payload for uptime monitors
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(relay: Arc<Relay>, config: Arc<Config>) -> Router {
    let state = AppState::new(relay, config.clone());

    let router = Router::new()
        .route("/", get(routes::liveness))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/upload", post(routes::upload))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // CORS applied last = outermost; browser userscripts are the expected
    // callers, so this is on by default
    if config.server.cors_enabled {
        router.layer(build_cors_layer(&config.server.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Supports "*" (or an empty list) for any origin, otherwise allows the
/// listed origins only.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Binds a TCP listener and serves the router until the process shuts
/// down or the server fails.
pub async fn start_api_server(relay: Arc<Relay>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.bind_address;

    let app = create_router(relay, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServer(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
