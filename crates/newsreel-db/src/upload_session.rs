use chrono::{DateTime, Duration, Utc};
use newsreel_core::models::UploadSession;
use newsreel_core::AppError;
use sqlx::{PgPool, Postgres};

/// Repository for chunked-upload sessions.
///
/// A session is created implicitly by the first chunk of an upload id and
/// deleted when assembly succeeds, which is what makes a completed upload
/// idempotent: chunks arriving after assembly find no session and open a
/// fresh one instead of corrupting the finished asset.
#[derive(Clone)]
pub struct UploadSessionRepository {
    pool: PgPool,
}

impl UploadSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the session for `upload_id`, creating it if this is the first
    /// chunk. An existing session must agree with the declared totals;
    /// a mismatch means the client changed its mind mid-upload.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions"))]
    pub async fn get_or_create(
        &self,
        upload_id: &str,
        total_chunks: i32,
        total_size: i64,
        content_type: &str,
        ttl_secs: u64,
    ) -> Result<UploadSession, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(ttl_secs as i64);

        let session = sqlx::query_as::<Postgres, UploadSession>(
            r#"
            INSERT INTO upload_sessions (
                upload_id, total_chunks, received_chunks, total_size,
                content_type, status, created_at, expires_at
            )
            VALUES ($1, $2, '{}', $3, $4, 'receiving', $5, $6)
            ON CONFLICT (upload_id) DO UPDATE SET upload_id = EXCLUDED.upload_id
            RETURNING *
            "#,
        )
        .bind(upload_id)
        .bind(total_chunks)
        .bind(total_size)
        .bind(content_type)
        .bind(now)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        if session.total_chunks != total_chunks || session.total_size != total_size {
            return Err(AppError::InvalidInput(format!(
                "Upload {} declared {} chunks / {} bytes but session has {} / {}",
                upload_id, total_chunks, total_size, session.total_chunks, session.total_size
            )));
        }

        Ok(session)
    }

    pub async fn get(&self, upload_id: &str) -> Result<Option<UploadSession>, AppError> {
        let session = sqlx::query_as::<Postgres, UploadSession>(
            "SELECT * FROM upload_sessions WHERE upload_id = $1",
        )
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// Record receipt of one chunk index. Appending is conditional on the
    /// index being absent, so chunk redelivery leaves the set unchanged.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "update"))]
    pub async fn record_chunk(
        &self,
        upload_id: &str,
        chunk_index: i32,
    ) -> Result<UploadSession, AppError> {
        let updated = sqlx::query_as::<Postgres, UploadSession>(
            r#"
            UPDATE upload_sessions
            SET received_chunks = array_append(received_chunks, $2)
            WHERE upload_id = $1 AND NOT ($2 = ANY(received_chunks))
            RETURNING *
            "#,
        )
        .bind(upload_id)
        .bind(chunk_index)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(session) => Ok(session),
            // Redelivered chunk: the index was already in the set.
            None => self
                .get(upload_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Upload session not found: {}", upload_id))),
        }
    }

    /// Mark a session whose assembly failed verification. Fragments are kept
    /// so the client can re-send the bad chunk and retry.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "update"))]
    pub async fn mark_failed_assembly(&self, upload_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE upload_sessions SET status = 'failed_assembly' WHERE upload_id = $1",
        )
        .bind(upload_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reset a failed session back to receiving once the client starts
    /// re-sending chunks.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "update"))]
    pub async fn mark_receiving(&self, upload_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE upload_sessions SET status = 'receiving' WHERE upload_id = $1")
            .bind(upload_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete the session row. Idempotent: deleting an already-removed
    /// session is not an error.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "delete"))]
    pub async fn delete(&self, upload_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM upload_sessions WHERE upload_id = $1")
            .bind(upload_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Sessions whose TTL has elapsed, oldest first. The expiry sweep deletes
    /// their fragments before removing the rows.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "select"))]
    pub async fn list_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<UploadSession>, AppError> {
        let expired = sqlx::query_as::<Postgres, UploadSession>(
            "SELECT * FROM upload_sessions WHERE expires_at <= $1 ORDER BY expires_at ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(expired)
    }
}
