//! Application state shared across handlers.

use std::sync::Arc;

use newsreel_core::{Config, MediaValidator};
use newsreel_db::{MediaRepository, UploadSessionRepository};
use newsreel_storage::Storage;
use sqlx::PgPool;

use crate::services::ChunkAssembler;

/// Everything the media handlers need: repositories, blob storage, the
/// content-type/size validator, and the chunk assembler.
#[derive(Clone)]
pub struct MediaState {
    pub repository: MediaRepository,
    pub sessions: UploadSessionRepository,
    pub storage: Arc<dyn Storage>,
    pub validator: MediaValidator,
    pub assembler: ChunkAssembler,
}

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub media: MediaState,
}
