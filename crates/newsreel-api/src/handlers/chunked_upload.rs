//! Chunked upload handler for large files.
//!
//! Clients split a file into fixed-size chunks and POST each one with the
//! same client-generated `upload_id`. Chunks may arrive in any order and may
//! be redelivered; the chunk that completes the set triggers assembly and the
//! response carries the registered asset.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use newsreel_core::AppError;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::MediaResponse;
use crate::services::{ChunkIntake, ChunkOutcome};
use crate::state::AppState;

/// Progress acknowledgement for one chunk.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChunkAckResponse {
    pub upload_id: String,
    /// Distinct chunk indices received so far
    pub received_chunks: i32,
    pub total_chunks: i32,
    /// True when this chunk completed the set and assembly succeeded
    pub assembled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaResponse>,
}

#[derive(Default)]
struct ChunkForm {
    upload_id: Option<String>,
    chunk_index: Option<i32>,
    total_chunks: Option<i32>,
    total_size: Option<i64>,
    content_type: Option<String>,
    data: Option<Vec<u8>>,
    caption: Option<String>,
    owner_ref: Option<Uuid>,
    is_public: bool,
}

async fn read_chunk_form(multipart: &mut Multipart) -> Result<ChunkForm, AppError> {
    let mut form = ChunkForm {
        is_public: true,
        ..Default::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "chunk" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read chunk: {}", e)))?;
                form.data = Some(bytes.to_vec());
            }
            "upload_id" | "chunk_index" | "total_chunks" | "total_size" | "content_type"
            | "caption" | "owner_ref" | "is_public" => {
                let text = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Invalid field '{}': {}", name, e))
                })?;
                match name.as_str() {
                    "upload_id" => form.upload_id = Some(text),
                    "chunk_index" => {
                        form.chunk_index = Some(text.parse().map_err(|_| {
                            AppError::InvalidInput("chunk_index must be an integer".into())
                        })?)
                    }
                    "total_chunks" => {
                        form.total_chunks = Some(text.parse().map_err(|_| {
                            AppError::InvalidInput("total_chunks must be an integer".into())
                        })?)
                    }
                    "total_size" => {
                        form.total_size = Some(text.parse().map_err(|_| {
                            AppError::InvalidInput("total_size must be an integer".into())
                        })?)
                    }
                    "content_type" => form.content_type = Some(text),
                    "caption" => {
                        if !text.is_empty() {
                            form.caption = Some(text);
                        }
                    }
                    "owner_ref" => {
                        form.owner_ref = Some(Uuid::parse_str(&text).map_err(|_| {
                            AppError::InvalidInput("owner_ref must be a UUID".into())
                        })?)
                    }
                    "is_public" => {
                        form.is_public = text.parse().map_err(|_| {
                            AppError::InvalidInput("is_public must be true or false".into())
                        })?
                    }
                    _ => unreachable!(),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Upload one chunk of a chunked upload.
#[utoipa::path(
    post,
    path = "/api/v0/media/chunk",
    tag = "media",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Chunk accepted (and asset assembled if final)", body = ChunkAckResponse),
        (status = 400, description = "Invalid input, unsupported content type, or assembly failure", body = ErrorResponse),
        (status = 413, description = "Chunk or file too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_chunk(
    caller: CallerContext,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_chunk_form(&mut multipart).await?;

    let upload_id = form
        .upload_id
        .ok_or_else(|| AppError::InvalidInput("Missing 'upload_id' field".to_string()))?;
    let chunk_index = form
        .chunk_index
        .ok_or_else(|| AppError::InvalidInput("Missing 'chunk_index' field".to_string()))?;
    let total_chunks = form
        .total_chunks
        .ok_or_else(|| AppError::InvalidInput("Missing 'total_chunks' field".to_string()))?;
    let total_size = form
        .total_size
        .ok_or_else(|| AppError::InvalidInput("Missing 'total_size' field".to_string()))?;
    let content_type = form
        .content_type
        .ok_or_else(|| AppError::InvalidInput("Missing 'content_type' field".to_string()))?;
    let data = form
        .data
        .ok_or_else(|| AppError::InvalidInput("Missing 'chunk' field".to_string()))?;

    if total_chunks <= 0 {
        return Err(AppError::InvalidInput("total_chunks must be positive".into()).into());
    }
    if data.is_empty() {
        return Err(AppError::InvalidInput("Chunk is empty".into()).into());
    }

    let media_type = state
        .media
        .validator
        .classify(&content_type)
        .map_err(HttpAppError::from)?;
    state
        .media
        .validator
        .validate_chunk_size(data.len())
        .map_err(HttpAppError::from)?;
    state
        .media
        .validator
        .validate_file_size(media_type, total_size as usize)
        .map_err(HttpAppError::from)?;

    let intake = ChunkIntake {
        upload_id,
        chunk_index,
        total_chunks,
        total_size,
        content_type,
        media_type,
        uploader_id: caller.user_id,
        uploader_role: caller.role.to_string(),
        owner_ref: form.owner_ref,
        is_public: form.is_public,
        caption: form.caption,
    };

    let upload_id = intake.upload_id.clone();
    let outcome = state.media.assembler.ingest_chunk(intake, &data).await?;

    let ack = match outcome {
        ChunkOutcome::Accepted(session) => ChunkAckResponse {
            upload_id: session.upload_id,
            received_chunks: session.received_chunks.len() as i32,
            total_chunks: session.total_chunks,
            assembled: false,
            media: None,
        },
        ChunkOutcome::Completed(asset) => ChunkAckResponse {
            upload_id,
            received_chunks: total_chunks,
            total_chunks,
            assembled: true,
            media: Some(MediaResponse::from(asset)),
        },
    };

    Ok(Json(ack))
}
