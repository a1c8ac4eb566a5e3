//! OpenAPI documentation and schema generation
//!
//! Compile-time OpenAPI specification for the relay's REST API, generated
//! with utoipa and served at `/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-relay REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-relay REST API",
        version = "0.1.0",
        description = "Relay service that downloads a remote media file and re-uploads it into a chat",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        crate::api::routes::upload,
        crate::api::routes::liveness,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Request/response types
        crate::types::RawUploadRequest,
        crate::api::routes::UploadResponse,

        // Core types
        crate::types::MediaKind,
        crate::types::ParseMode,
        crate::types::MessageId,

        // Error types
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "upload", description = "Media relay - download a remote file and deliver it to a chat"),
        (name = "system", description = "System endpoints - liveness, health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
