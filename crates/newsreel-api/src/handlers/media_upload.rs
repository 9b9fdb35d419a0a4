//! Direct (single-request) media upload.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use newsreel_core::AppError;
use newsreel_db::NewMediaAsset;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::MediaResponse;
use crate::services::keys;
use crate::state::AppState;

/// Upload a media file in one request.
///
/// Images go live immediately (`completed`); videos are registered `pending`
/// and picked up by the transcoding sweep.
#[utoipa::path(
    post,
    path = "/api/v0/media",
    tag = "media",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Media uploaded", body = MediaResponse),
        (status = 400, description = "Invalid input or unsupported content type", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_media(
    caller: CallerContext,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut content_type: Option<String> = None;
    let mut caption: Option<String> = None;
    let mut owner_ref: Option<Uuid> = None;
    let mut is_public = true;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {}", e)))?;
                file_bytes = Some(bytes.to_vec());
            }
            "caption" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Invalid caption: {}", e)))?;
                if !text.is_empty() {
                    caption = Some(text);
                }
            }
            "owner_ref" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Invalid owner_ref: {}", e)))?;
                owner_ref = Some(
                    Uuid::parse_str(&text)
                        .map_err(|_| AppError::InvalidInput("owner_ref must be a UUID".into()))?,
                );
            }
            "is_public" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Invalid is_public: {}", e)))?;
                is_public = text
                    .parse::<bool>()
                    .map_err(|_| AppError::InvalidInput("is_public must be true or false".into()))?;
            }
            _ => {}
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| AppError::InvalidInput("Missing 'file' field".to_string()))?;
    let content_type = content_type
        .ok_or_else(|| AppError::InvalidInput("File field has no content type".to_string()))?;

    let media_type = state
        .media
        .validator
        .classify(&content_type)
        .map_err(HttpAppError::from)?;
    state
        .media
        .validator
        .validate_file_size(media_type, file_bytes.len())
        .map_err(HttpAppError::from)?;

    let media_id = Uuid::new_v4();
    let storage_key = keys::media_key(media_id, media_type, &content_type);
    let file_size = file_bytes.len() as i64;

    let url = state
        .media
        .storage
        .write_file(&storage_key, file_bytes)
        .await
        .map_err(HttpAppError::from)?;

    let asset = state
        .media
        .repository
        .create_media(NewMediaAsset {
            media_type,
            storage_key,
            url,
            thumbnail_url: None,
            content_type,
            file_size,
            uploader_id: caller.user_id,
            uploader_role: caller.role.to_string(),
            owner_ref,
            is_public,
            caption,
        })
        .await
        .map_err(HttpAppError::from)?;

    Ok((StatusCode::CREATED, Json(MediaResponse::from(asset))))
}
