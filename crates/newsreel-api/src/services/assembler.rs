//! Chunked upload orchestration: session bookkeeping, fragment writes, and
//! final assembly into a media asset.

use std::sync::Arc;

use uuid::Uuid;

use newsreel_core::models::{MediaType, SessionStatus, UploadSession};
use newsreel_core::AppError;
use newsreel_db::{MediaRepository, NewMediaAsset, UploadSessionRepository};
use newsreel_storage::{Storage, StorageError};

use crate::services::keys;

/// One incoming chunk plus the metadata the final asset record needs.
pub struct ChunkIntake {
    pub upload_id: String,
    pub chunk_index: i32,
    pub total_chunks: i32,
    pub total_size: i64,
    pub content_type: String,
    pub media_type: MediaType,
    pub uploader_id: Uuid,
    pub uploader_role: String,
    pub owner_ref: Option<Uuid>,
    pub is_public: bool,
    pub caption: Option<String>,
}

/// Result of ingesting one chunk.
pub enum ChunkOutcome {
    /// Chunk stored; more chunks outstanding.
    Accepted(UploadSession),
    /// This chunk completed the set; the asset was assembled and registered.
    Completed(newsreel_core::models::MediaAsset),
}

/// Drives a chunked upload from first fragment to registered asset.
///
/// Assembly order is fixed: verify and assemble the file, register the asset,
/// then delete fragments and the session row. A crash mid-sequence leaves the
/// session (and fragments) in place, so the next chunk delivery retries
/// assembly instead of losing the upload. Deleting the session last is also
/// what makes a finished upload idempotent.
#[derive(Clone)]
pub struct ChunkAssembler {
    sessions: UploadSessionRepository,
    media: MediaRepository,
    storage: Arc<dyn Storage>,
    base_url: String,
    session_ttl_secs: u64,
}

impl ChunkAssembler {
    pub fn new(
        sessions: UploadSessionRepository,
        media: MediaRepository,
        storage: Arc<dyn Storage>,
        base_url: String,
        session_ttl_secs: u64,
    ) -> Self {
        Self {
            sessions,
            media,
            storage,
            base_url,
            session_ttl_secs,
        }
    }

    #[tracing::instrument(
        skip(self, intake, data),
        fields(upload_id = %intake.upload_id, chunk_index = intake.chunk_index)
    )]
    pub async fn ingest_chunk(
        &self,
        intake: ChunkIntake,
        data: &[u8],
    ) -> Result<ChunkOutcome, AppError> {
        if intake.chunk_index < 0 || intake.chunk_index >= intake.total_chunks {
            return Err(AppError::InvalidInput(format!(
                "Chunk index {} out of range for {} chunks",
                intake.chunk_index, intake.total_chunks
            )));
        }

        let session = self
            .sessions
            .get_or_create(
                &intake.upload_id,
                intake.total_chunks,
                intake.total_size,
                &intake.content_type,
                self.session_ttl_secs,
            )
            .await?;

        // A re-sent chunk after a failed assembly reopens the session; the
        // flag only means "the last attempt did not verify".
        if session.status == SessionStatus::FailedAssembly {
            self.sessions.mark_receiving(&session.upload_id).await?;
        }

        // Writing the fragment before recording it means a crash between the
        // two steps leaves an orphan fragment that redelivery overwrites,
        // never a recorded index with no bytes behind it.
        self.storage
            .write_chunk(&intake.upload_id, intake.chunk_index, data)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let session = self
            .sessions
            .record_chunk(&session.upload_id, intake.chunk_index)
            .await?;

        if !session.is_complete() {
            return Ok(ChunkOutcome::Accepted(session));
        }

        let asset = self.assemble(&session, &intake).await?;
        Ok(ChunkOutcome::Completed(asset))
    }

    async fn assemble(
        &self,
        session: &UploadSession,
        intake: &ChunkIntake,
    ) -> Result<newsreel_core::models::MediaAsset, AppError> {
        let media_id = Uuid::new_v4();
        let storage_key = keys::media_key(media_id, intake.media_type, &intake.content_type);

        let assembled_size = match self
            .storage
            .assemble_chunks(
                &session.upload_id,
                &session.ordered_indices(),
                &storage_key,
                session.total_size as u64,
            )
            .await
        {
            Ok(size) => size,
            Err(StorageError::SizeMismatch { actual, expected }) => {
                // Fragments are retained so the client can re-send the bad
                // chunk; the session is flagged until it does.
                self.sessions.mark_failed_assembly(&session.upload_id).await?;
                return Err(AppError::Assembly {
                    upload_id: session.upload_id.clone(),
                    message: format!(
                        "Assembled size {} does not match declared size {}",
                        actual, expected
                    ),
                });
            }
            Err(e) => {
                return Err(AppError::Assembly {
                    upload_id: session.upload_id.clone(),
                    message: e.to_string(),
                })
            }
        };

        let url = keys::public_url(&self.base_url, &storage_key);
        let asset = self
            .media
            .create_media(NewMediaAsset {
                media_type: intake.media_type,
                storage_key: storage_key.clone(),
                url,
                thumbnail_url: None,
                content_type: intake.content_type.clone(),
                file_size: assembled_size as i64,
                uploader_id: intake.uploader_id,
                uploader_role: intake.uploader_role.clone(),
                owner_ref: intake.owner_ref,
                is_public: intake.is_public,
                caption: intake.caption.clone(),
            })
            .await?;

        if let Err(e) = self.storage.delete_chunks(&session.upload_id).await {
            tracing::warn!(
                upload_id = %session.upload_id,
                error = %e,
                "Failed to delete chunk fragments after assembly"
            );
        }
        self.sessions.delete(&session.upload_id).await?;

        tracing::info!(
            upload_id = %session.upload_id,
            media_id = %asset.id,
            file_size = asset.file_size,
            media_type = %asset.media_type,
            "Chunked upload assembled"
        );

        Ok(asset)
    }
}
