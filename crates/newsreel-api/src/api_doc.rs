//! OpenAPI document.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use crate::handlers::chunked_upload::ChunkAckResponse;
use crate::handlers::media_delete::DeleteMediaResponse;
use crate::handlers::media_get::{MediaListResponse, StatusPollResponse};
use crate::handlers::media_status::UpdateStatusRequest;
use crate::handlers::MediaResponse;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::media_upload::upload_media,
        handlers::chunked_upload::upload_chunk,
        handlers::media_get::list_media,
        handlers::media_get::get_media,
        handlers::media_get::poll_status,
        handlers::media_status::update_status,
        handlers::media_status::reenqueue_media,
        handlers::media_delete::delete_media,
        handlers::video_stream::stream_media,
    ),
    components(schemas(
        ErrorResponse,
        MediaResponse,
        MediaListResponse,
        StatusPollResponse,
        ChunkAckResponse,
        DeleteMediaResponse,
        UpdateStatusRequest,
    )),
    tags(
        (name = "media", description = "Media upload, management, and streaming")
    )
)]
pub struct ApiDoc;
