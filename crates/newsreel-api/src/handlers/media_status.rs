//! Administrative status management: explicit status transitions and
//! re-enqueueing failed videos.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use newsreel_core::models::ProcessingStatus;
use newsreel_core::AppError;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::MediaResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Target status: pending, processing, completed, or failed
    pub status: String,
}

/// Force a status transition. Elevated roles only; the state machine still
/// applies, so only forward transitions are accepted.
#[utoipa::path(
    patch,
    path = "/api/v0/media/{id}/status",
    tag = "media",
    params(("id" = Uuid, Path, description = "Media ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = MediaResponse),
        (status = 400, description = "Unknown status or illegal transition", body = ErrorResponse),
        (status = 403, description = "Caller is not elevated", body = ErrorResponse),
        (status = 404, description = "Media not found", body = ErrorResponse)
    )
)]
pub async fn update_status(
    caller: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !caller.is_elevated() {
        return Err(AppError::Forbidden("Only editors and admins can change status".into()).into());
    }

    let status = request.status.parse::<ProcessingStatus>()?;

    let asset = state
        .media
        .repository
        .update_processing_status(id, status)
        .await?;

    tracing::info!(
        media_id = %id,
        new_status = %status,
        caller = %caller.user_id,
        "Processing status updated by operator"
    );

    Ok(Json(MediaResponse::from(asset)))
}

/// Re-enqueue a failed video for processing. This is the only sanctioned
/// status regression (`failed -> pending`); the next transcoding sweep picks
/// the asset up again.
#[utoipa::path(
    post,
    path = "/api/v0/media/{id}/reenqueue",
    tag = "media",
    params(("id" = Uuid, Path, description = "Media ID")),
    responses(
        (status = 200, description = "Media re-enqueued", body = MediaResponse),
        (status = 400, description = "Media is not in failed state", body = ErrorResponse),
        (status = 403, description = "Caller is not elevated", body = ErrorResponse),
        (status = 404, description = "Media not found", body = ErrorResponse)
    )
)]
pub async fn reenqueue_media(
    caller: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !caller.is_elevated() {
        return Err(AppError::Forbidden("Only editors and admins can re-enqueue".into()).into());
    }

    let asset = state.media.repository.reenqueue(id).await?;

    tracing::info!(
        media_id = %id,
        caller = %caller.user_id,
        "Media re-enqueued by operator"
    );

    Ok(Json(MediaResponse::from(asset)))
}
