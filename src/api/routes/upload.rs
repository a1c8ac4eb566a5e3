//! Upload handler: the relay's single working endpoint

use crate::api::AppState;
use crate::error::Result;
use crate::types::{MessageId, RawUploadRequest};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Success payload of `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Always true on the success path
    pub ok: bool,
    /// Identifier of the message carrying the delivered media
    pub message_id: MessageId,
}

/// POST /upload - relay a remote media file into a chat
///
/// Accepts the loosely-typed wire shape, normalizes it once at this
/// boundary, then hands the typed request to the relay. Errors surface as
/// the structured envelope with 400 for unusable requests and 500 for
/// delivery failures.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "upload",
    request_body = RawUploadRequest,
    responses(
        (status = 200, description = "Media delivered", body = UploadResponse),
        (status = 400, description = "Invalid request (bad URL, missing fields)", body = crate::error::ApiError),
        (status = 500, description = "Download or upload failed", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    Json(raw): Json<RawUploadRequest>,
) -> Result<Json<UploadResponse>> {
    let request = raw.normalize()?;

    tracing::info!(
        destination = %request.destination,
        url = %request.source_url,
        kind = ?request.kind,
        parse_mode = ?request.parse_mode,
        "upload requested"
    );

    let message_id = state.relay.deliver(&request).await?;

    Ok(Json(UploadResponse {
        ok: true,
        message_id,
    }))
}
