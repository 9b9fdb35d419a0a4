pub mod chunked_upload;
pub mod media_delete;
pub mod media_get;
pub mod media_status;
pub mod media_upload;
pub mod video_stream;

use chrono::{DateTime, Utc};
use newsreel_core::models::{MediaAsset, MediaType, ProcessingStatus};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Public representation of a media asset. Storage keys and uploader role
/// stay internal.
#[derive(Debug, Serialize, ToSchema)]
pub struct MediaResponse {
    pub id: Uuid,
    pub media_type: MediaType,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub content_type: String,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    pub processing_status: ProcessingStatus,
    pub uploader_id: Uuid,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MediaAsset> for MediaResponse {
    fn from(asset: MediaAsset) -> Self {
        Self {
            id: asset.id,
            media_type: asset.media_type,
            url: asset.url,
            thumbnail_url: asset.thumbnail_url,
            content_type: asset.content_type,
            file_size: asset.file_size,
            duration: asset.duration,
            width: asset.width,
            height: asset.height,
            processing_status: asset.processing_status,
            uploader_id: asset.uploader_id,
            is_public: asset.is_public,
            caption: asset.caption,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}
