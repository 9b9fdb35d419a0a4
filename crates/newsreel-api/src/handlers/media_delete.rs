//! Media deletion.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use newsreel_core::AppError;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteMediaResponse {
    pub success: bool,
    pub message: String,
}

/// Delete a media asset: record first, then the underlying file. Journalists
/// may only delete their own uploads; editors and admins may delete any.
#[utoipa::path(
    delete,
    path = "/api/v0/media/{id}",
    tag = "media",
    params(("id" = Uuid, Path, description = "Media ID")),
    responses(
        (status = 200, description = "Media deleted", body = DeleteMediaResponse),
        (status = 403, description = "Caller may not delete this media", body = ErrorResponse),
        (status = 404, description = "Media not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_media(
    caller: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let asset = state.media.repository.get_by_id(id).await?;

    if !asset.can_be_deleted_by(caller.user_id, caller.is_elevated()) {
        return Err(
            AppError::Forbidden("Only the uploader or an editor can delete this media".into())
                .into(),
        );
    }

    // Record first: once the row is gone the asset is unreachable, and an
    // orphaned file is recoverable garbage rather than a dangling record.
    state.media.repository.delete(id).await?;

    if let Err(e) = state.media.storage.delete(&asset.storage_key).await {
        tracing::warn!(
            media_id = %id,
            storage_key = %asset.storage_key,
            error = %e,
            "Failed to delete media file after removing record"
        );
    }

    Ok(Json(DeleteMediaResponse {
        success: true,
        message: "Media deleted".to_string(),
    }))
}
