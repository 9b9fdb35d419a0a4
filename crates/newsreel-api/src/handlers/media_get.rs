//! Media listing and the processing-status poller.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use newsreel_core::models::{MediaType, ProcessingStatus};
use newsreel_core::AppError;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::MediaResponse;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMediaQuery {
    /// 1-based page number
    pub page: Option<i64>,
    /// Items per page (max 100)
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MediaListResponse {
    pub items: Vec<MediaResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// List media assets. Journalists see their own uploads plus public assets;
/// editors and admins see everything.
#[utoipa::path(
    get,
    path = "/api/v0/media",
    tag = "media",
    params(ListMediaQuery),
    responses(
        (status = 200, description = "Page of media assets", body = MediaListResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_media(
    caller: CallerContext,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMediaQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let (assets, total) = state
        .media
        .repository
        .list(page, limit, caller.user_id, caller.is_elevated())
        .await?;

    Ok(Json(MediaListResponse {
        items: assets.into_iter().map(MediaResponse::from).collect(),
        total,
        page,
        limit,
    }))
}

/// Fetch one media asset by id.
#[utoipa::path(
    get,
    path = "/api/v0/media/{id}",
    tag = "media",
    params(("id" = Uuid, Path, description = "Media ID")),
    responses(
        (status = 200, description = "Media asset", body = MediaResponse),
        (status = 403, description = "Not visible to this caller", body = ErrorResponse),
        (status = 404, description = "Media not found", body = ErrorResponse)
    )
)]
pub async fn get_media(
    caller: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let asset = state.media.repository.get_by_id(id).await?;

    if !asset.is_public && asset.uploader_id != caller.user_id && !caller.is_elevated() {
        return Err(AppError::Forbidden("Media is not visible to this caller".into()).into());
    }

    Ok(Json(MediaResponse::from(asset)))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusPollQuery {
    /// Public URL previously returned by an upload
    pub url: String,
}

/// Answer for the status poller. `exists: false` means the URL is not (or no
/// longer) registered; `status` is present only when it is.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusPollResponse {
    pub url: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProcessingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
}

/// Poll processing status by public URL. Editor UIs call this after an upload
/// to know when a video becomes playable; an unknown URL is a normal answer,
/// not an error.
#[utoipa::path(
    get,
    path = "/api/v0/media/status",
    tag = "media",
    params(StatusPollQuery),
    responses(
        (status = 200, description = "Processing status for the URL", body = StatusPollResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse)
    )
)]
pub async fn poll_status(
    _caller: CallerContext,
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusPollQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let asset = state.media.repository.get_by_url(&query.url).await?;

    let response = match asset {
        Some(asset) => StatusPollResponse {
            url: query.url,
            exists: true,
            status: Some(asset.processing_status),
            media_type: Some(asset.media_type),
        },
        None => StatusPollResponse {
            url: query.url,
            exists: false,
            status: None,
            media_type: None,
        },
    };

    Ok(Json(response))
}
