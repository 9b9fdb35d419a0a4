use chrono::Utc;
use newsreel_core::models::{MediaAsset, MediaType, ProcessingStatus, VideoMetadata};
use newsreel_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for media asset records and the processing state machine.
///
/// Status transitions are enforced at the SQL layer as conditional updates,
/// so concurrent sweeps (or multiple worker processes) can never move the same
/// record twice: the losing writer simply matches zero rows.
#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

/// Parameters for creating a media asset record.
#[derive(Debug, Clone)]
pub struct NewMediaAsset {
    pub media_type: MediaType,
    pub storage_key: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub content_type: String,
    pub file_size: i64,
    pub uploader_id: Uuid,
    pub uploader_role: String,
    pub owner_ref: Option<Uuid>,
    pub is_public: bool,
    pub caption: Option<String>,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a media asset. Videos start `pending`; images are created
    /// directly as `completed` and never enter the worker pipeline.
    #[tracing::instrument(skip(self, asset), fields(db.table = "media_assets", db.operation = "insert"))]
    pub async fn create_media(&self, asset: NewMediaAsset) -> Result<MediaAsset, AppError> {
        let id = Uuid::new_v4();
        let status = MediaAsset::initial_status(asset.media_type);
        let now = Utc::now();

        let created: MediaAsset = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            INSERT INTO media_assets (
                id, media_type, storage_key, url, thumbnail_url,
                content_type, file_size, processing_status,
                uploader_id, uploader_role, owner_ref, is_public, caption,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(asset.media_type)
        .bind(&asset.storage_key)
        .bind(&asset.url)
        .bind(&asset.thumbnail_url)
        .bind(&asset.content_type)
        .bind(asset.file_size)
        .bind(status)
        .bind(asset.uploader_id)
        .bind(&asset.uploader_role)
        .bind(asset.owner_ref)
        .bind(asset.is_public)
        .bind(&asset.caption)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            media_id = %created.id,
            media_type = %created.media_type,
            processing_status = %created.processing_status,
            "Media asset created"
        );

        Ok(created)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<MediaAsset, AppError> {
        sqlx::query_as::<Postgres, MediaAsset>("SELECT * FROM media_assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media not found: {}", id)))
    }

    /// Lookup by public URL. Absence is a normal outcome for the status
    /// poller, so this returns an Option rather than an error.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<MediaAsset>, AppError> {
        let asset =
            sqlx::query_as::<Postgres, MediaAsset>("SELECT * FROM media_assets WHERE url = $1")
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;
        Ok(asset)
    }

    /// Paginated listing. Elevated callers see everything; others see their
    /// own uploads plus explicitly public assets.
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "select"))]
    pub async fn list(
        &self,
        page: i64,
        limit: i64,
        caller_id: Uuid,
        elevated: bool,
    ) -> Result<(Vec<MediaAsset>, i64), AppError> {
        let offset = (page.max(1) - 1) * limit;

        let (assets, total) = if elevated {
            let assets = sqlx::query_as::<Postgres, MediaAsset>(
                "SELECT * FROM media_assets ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_assets")
                .fetch_one(&self.pool)
                .await?;
            (assets, total)
        } else {
            let assets = sqlx::query_as::<Postgres, MediaAsset>(
                r#"
                SELECT * FROM media_assets
                WHERE uploader_id = $1 OR is_public
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(caller_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM media_assets WHERE uploader_id = $1 OR is_public",
            )
            .bind(caller_id)
            .fetch_one(&self.pool)
            .await?;
            (assets, total)
        };

        Ok((assets, total))
    }

    /// Apply a forward state-machine transition. The WHERE clause encodes the
    /// legal edges, so an illegal request (regression, skip, or transition out
    /// of a terminal state) matches zero rows and is rejected.
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "update"))]
    pub async fn update_processing_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> Result<MediaAsset, AppError> {
        let updated = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            UPDATE media_assets
            SET processing_status = $2, updated_at = NOW()
            WHERE id = $1
              AND (
                    (processing_status = 'pending' AND $2 = 'processing')
                 OR (processing_status = 'processing' AND $2 IN ('completed', 'failed'))
              )
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(asset) => Ok(asset),
            None => {
                // Distinguish an unknown id from an illegal transition.
                let current = self.get_by_id(id).await?;
                Err(AppError::InvalidInput(format!(
                    "Illegal status transition {} -> {} for media {}",
                    current.processing_status, status, id
                )))
            }
        }
    }

    /// Atomic claim: flip `pending -> processing` iff the record is still
    /// pending. Exactly one of any number of concurrent callers wins; the
    /// rest observe `false`.
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "update"))]
    pub async fn claim_for_processing(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE media_assets
            SET processing_status = 'processing', updated_at = NOW()
            WHERE id = $1 AND processing_status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Claim the oldest pending video, if any. Uses `FOR UPDATE SKIP LOCKED`
    /// inside a transaction so parallel sweeps each claim distinct records.
    #[tracing::instrument(skip(self))]
    pub async fn claim_next_pending(&self) -> Result<Option<MediaAsset>, AppError> {
        let mut tx = self.pool.begin().await?;

        let candidate: Option<MediaAsset> = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            SELECT * FROM media_assets
            WHERE processing_status = 'pending' AND media_type = 'video'
            ORDER BY created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(candidate) = candidate else {
            tx.commit().await?;
            return Ok(None);
        };

        let claimed: MediaAsset = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            UPDATE media_assets
            SET processing_status = 'processing', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(candidate.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(media_id = %claimed.id, "Pending video claimed for processing");
        Ok(Some(claimed))
    }

    /// Record probed metadata and mark the asset completed. Only valid while
    /// the record is in `processing` (i.e. held by the calling worker).
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "update"))]
    pub async fn complete_processing(
        &self,
        id: Uuid,
        metadata: VideoMetadata,
    ) -> Result<MediaAsset, AppError> {
        sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            UPDATE media_assets
            SET processing_status = 'completed',
                duration = $2, width = $3, height = $4,
                updated_at = NOW()
            WHERE id = $1 AND processing_status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(metadata.duration)
        .bind(metadata.width)
        .bind(metadata.height)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Media {} is not currently processing", id))
        })
    }

    /// Mark the asset failed. The cause is logged by the worker, not
    /// persisted on the record.
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "update"))]
    pub async fn fail_processing(&self, id: Uuid) -> Result<MediaAsset, AppError> {
        sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            UPDATE media_assets
            SET processing_status = 'failed', updated_at = NOW()
            WHERE id = $1 AND processing_status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Media {} is not currently processing", id))
        })
    }

    /// Explicit administrative re-enqueue: `failed -> pending`. This is the
    /// only sanctioned status regression; there is no automatic retry.
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "update"))]
    pub async fn reenqueue(&self, id: Uuid) -> Result<MediaAsset, AppError> {
        let reenqueued = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            UPDATE media_assets
            SET processing_status = 'pending',
                duration = NULL, width = NULL, height = NULL,
                updated_at = NOW()
            WHERE id = $1 AND processing_status = 'failed'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match reenqueued {
            Some(asset) => {
                tracing::info!(media_id = %id, "Failed media re-enqueued for processing");
                Ok(asset)
            }
            None => {
                let current = self.get_by_id(id).await?;
                Err(AppError::InvalidInput(format!(
                    "Media {} is {}, only failed assets can be re-enqueued",
                    id, current.processing_status
                )))
            }
        }
    }

    /// Remove the record. The caller is responsible for removing the
    /// underlying file via storage (and for the authorization check).
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "delete"))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM media_assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Media not found: {}", id)));
        }

        tracing::info!(media_id = %id, "Media asset deleted");
        Ok(())
    }

    /// Cascade used when an owning content entity is deleted: returns the
    /// removed assets so the caller can delete the underlying files.
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "delete"))]
    pub async fn delete_by_owner_ref(&self, owner_ref: Uuid) -> Result<Vec<MediaAsset>, AppError> {
        let removed = sqlx::query_as::<Postgres, MediaAsset>(
            "DELETE FROM media_assets WHERE owner_ref = $1 RETURNING *",
        )
        .bind(owner_ref)
        .fetch_all(&self.pool)
        .await?;

        if !removed.is_empty() {
            tracing::info!(
                owner_ref = %owner_ref,
                count = removed.len(),
                "Media assets removed with owning content"
            );
        }
        Ok(removed)
    }
}
