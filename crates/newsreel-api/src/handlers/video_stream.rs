//! Range-aware media streaming.
//!
//! Serves completed assets with byte-range support so browsers can seek
//! videos. A syntactically invalid or unsatisfiable Range header yields 416
//! with a `Content-Range: bytes */<size>` header, which tells players the
//! real size so they can re-request a valid window.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use futures::StreamExt;
use uuid::Uuid;

use newsreel_core::models::{MediaType, ProcessingStatus};
use newsreel_core::AppError;

use crate::auth::MaybeCaller;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Parsed `Range: bytes=...` header: an inclusive byte window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Parse a single-range `Range` header against a file of `file_size` bytes.
///
/// Strict: the window must lie entirely within the file. Anything else is an
/// error rather than silently clamped, so a player asking for bytes that do
/// not exist learns the real size from the 416 instead of getting a
/// misleading partial answer. Start is required (no `bytes=-N` suffix form)
/// and multi-range requests are unsupported.
pub fn parse_range(header: &str, file_size: u64) -> Result<ByteRange, ()> {
    let spec = header.strip_prefix("bytes=").ok_or(())?;
    if spec.contains(',') {
        return Err(());
    }
    if file_size == 0 {
        return Err(());
    }

    let (start_str, end_str) = spec.split_once('-').ok_or(())?;

    let start: u64 = start_str.parse().map_err(|_| ())?;
    if start >= file_size {
        return Err(());
    }

    let end = if end_str.is_empty() {
        file_size - 1
    } else {
        let end: u64 = end_str.parse().map_err(|_| ())?;
        if end < start || end >= file_size {
            return Err(());
        }
        end
    };

    Ok(ByteRange { start, end })
}

/// Stream a media file, honoring a single `Range` header.
#[utoipa::path(
    get,
    path = "/api/v0/media/{id}/stream",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Media ID"),
        ("Range" = Option<String>, Header, description = "Single byte range, e.g. bytes=0-1023")
    ),
    responses(
        (status = 200, description = "Full file"),
        (status = 206, description = "Requested byte range"),
        (status = 400, description = "Media is not a video", body = ErrorResponse),
        (status = 403, description = "Media is not visible to this caller", body = ErrorResponse),
        (status = 404, description = "Media not found or not yet processed", body = ErrorResponse),
        (status = 416, description = "Range not satisfiable", body = ErrorResponse)
    )
)]
pub async fn stream_media(
    MaybeCaller(caller): MaybeCaller,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let asset = state.media.repository.get_by_id(id).await?;

    if !asset.is_public {
        let visible = caller
            .as_ref()
            .map(|c| c.user_id == asset.uploader_id || c.is_elevated())
            .unwrap_or(false);
        if !visible {
            return Err(AppError::Forbidden("Media is not visible to this caller".into()).into());
        }
    }

    if asset.media_type != MediaType::Video {
        return Err(AppError::InvalidInput(format!("Media {} is not a video", id)).into());
    }

    // Unprocessed videos have no playable file yet.
    if asset.processing_status != ProcessingStatus::Completed {
        return Err(AppError::NotFound(format!(
            "Media {} is not ready for streaming (status: {})",
            id, asset.processing_status
        ))
        .into());
    }

    let file_size = match state.media.storage.content_length(&asset.storage_key).await {
        Ok(size) => size,
        Err(newsreel_storage::StorageError::NotFound(_)) => {
            // Record exists but the file is gone: storage and registry have
            // diverged, which operators need to hear about.
            tracing::error!(
                media_id = %id,
                storage_key = %asset.storage_key,
                "Media record has no backing file"
            );
            return Err(AppError::NotFound(format!("Media file missing for {}", id)).into());
        }
        Err(e) => return Err(HttpAppError::from(e)),
    };

    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let Some(range_header) = range_header else {
        // No Range: full-file 200, advertising range support.
        let stream = state
            .media
            .storage
            .download_stream(&asset.storage_key)
            .await
            .map_err(HttpAppError::from)?;
        let body_stream = stream.map(|result| {
            result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
        });

        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, &asset.content_type)
            .header(header::CONTENT_LENGTH, file_size)
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::from_stream(body_stream))
            .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)).into());
    };

    let Ok(range) = parse_range(&range_header, file_size) else {
        tracing::debug!(
            media_id = %id,
            range = %range_header,
            file_size,
            "Unsatisfiable range request"
        );
        return Err(AppError::RangeNotSatisfiable {
            requested: range_header,
            file_size,
        }
        .into());
    };

    let stream = state
        .media
        .storage
        .read_range(&asset.storage_key, range.start, range.end)
        .await
        .map_err(HttpAppError::from)?;
    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, &asset.content_type)
        .header(header::CONTENT_LENGTH, range.end - range.start + 1)
        .header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", range.start, range.end, file_size),
        )
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_range() {
        assert_eq!(
            parse_range("bytes=0-99", 1000),
            Ok(ByteRange { start: 0, end: 99 })
        );
        assert_eq!(
            parse_range("bytes=500-999", 1000),
            Ok(ByteRange {
                start: 500,
                end: 999
            })
        );
    }

    #[test]
    fn open_ended_range_runs_to_eof() {
        assert_eq!(
            parse_range("bytes=500-", 1000),
            Ok(ByteRange {
                start: 500,
                end: 999
            })
        );
    }

    #[test]
    fn suffix_form_is_rejected() {
        // Start is required; the bytes=-N suffix form is not supported.
        assert!(parse_range("bytes=-100", 1000).is_err());
    }

    #[test]
    fn end_past_eof_is_unsatisfiable() {
        assert!(parse_range("bytes=900-5000", 1000).is_err());
        assert!(parse_range("bytes=0-1000", 1000).is_err());
        // The last valid byte is fine.
        assert_eq!(
            parse_range("bytes=0-999", 1000),
            Ok(ByteRange { start: 0, end: 999 })
        );
    }

    #[test]
    fn start_past_eof_is_unsatisfiable() {
        assert!(parse_range("bytes=1000-", 1000).is_err());
        assert!(parse_range("bytes=1500-2000", 1000).is_err());
    }

    #[test]
    fn inverted_range_is_unsatisfiable() {
        assert!(parse_range("bytes=500-100", 1000).is_err());
    }

    #[test]
    fn malformed_headers_are_unsatisfiable() {
        assert!(parse_range("bytes=abc-def", 1000).is_err());
        assert!(parse_range("bytes=", 1000).is_err());
        assert!(parse_range("bytes=-", 1000).is_err());
        assert!(parse_range("items=0-99", 1000).is_err());
        assert!(parse_range("0-99", 1000).is_err());
    }

    #[test]
    fn multiple_ranges_are_unsupported() {
        assert!(parse_range("bytes=0-99,200-299", 1000).is_err());
    }

    #[test]
    fn empty_file_satisfies_no_range() {
        assert!(parse_range("bytes=0-0", 0).is_err());
        assert!(parse_range("bytes=0-", 0).is_err());
    }
}
