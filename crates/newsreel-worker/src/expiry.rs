//! Expiry sweep for abandoned chunked uploads.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use newsreel_db::UploadSessionRepository;
use newsreel_storage::Storage;

use crate::scheduler::Job;

/// Removes upload sessions whose TTL has elapsed: chunk fragments first, then
/// the session row. A failure on one session is logged and the sweep moves on;
/// the session will be picked up again on the next run.
pub struct SessionExpirySweep {
    sessions: UploadSessionRepository,
    storage: Arc<dyn Storage>,
}

impl SessionExpirySweep {
    pub fn new(sessions: UploadSessionRepository, storage: Arc<dyn Storage>) -> Self {
        Self { sessions, storage }
    }
}

#[async_trait]
impl Job for SessionExpirySweep {
    #[tracing::instrument(skip(self))]
    async fn run(&self) -> Result<()> {
        let expired = self.sessions.list_expired(Utc::now()).await?;
        if expired.is_empty() {
            return Ok(());
        }

        let mut reclaimed = 0usize;
        for session in &expired {
            // Fragments go first so a crash between the two steps leaves the
            // row behind for the next sweep, never orphaned fragments.
            if let Err(e) = self.storage.delete_chunks(&session.upload_id).await {
                tracing::warn!(
                    upload_id = %session.upload_id,
                    error = %e,
                    "Failed to delete chunk fragments for expired session"
                );
                continue;
            }
            if let Err(e) = self.sessions.delete(&session.upload_id).await {
                tracing::warn!(
                    upload_id = %session.upload_id,
                    error = %e,
                    "Failed to delete expired session row"
                );
                continue;
            }
            reclaimed += 1;
        }

        tracing::info!(
            expired = expired.len(),
            reclaimed,
            "Upload session expiry sweep finished"
        );
        Ok(())
    }
}
