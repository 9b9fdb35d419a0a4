//! Transcoding sweep: drains pending videos and records probed metadata.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use newsreel_db::MediaRepository;

use crate::prober::VideoProber;
use crate::scheduler::Job;

/// Each run drains the pending-video queue: records are claimed one at a
/// time via the repository's `FOR UPDATE SKIP LOCKED` claim, so multiple
/// processes running this sweep never touch the same record.
///
/// A probe failure marks only that record `failed`; the sweep continues with
/// the next claim. Failed records stay failed until an operator re-enqueues
/// them.
pub struct TranscodeSweep {
    media: MediaRepository,
    prober: Arc<dyn VideoProber>,
    media_root: PathBuf,
}

impl TranscodeSweep {
    pub fn new(media: MediaRepository, prober: Arc<dyn VideoProber>, media_root: PathBuf) -> Self {
        Self {
            media,
            prober,
            media_root,
        }
    }
}

#[async_trait]
impl Job for TranscodeSweep {
    #[tracing::instrument(skip(self))]
    async fn run(&self) -> Result<()> {
        let mut processed = 0u32;
        let mut failed = 0u32;

        while let Some(asset) = self.media.claim_next_pending().await? {
            let path = self.media_root.join(&asset.storage_key);

            match self.prober.probe(&path).await {
                Ok(metadata) => {
                    self.media.complete_processing(asset.id, metadata).await?;
                    processed += 1;
                    tracing::info!(media_id = %asset.id, "Video processing completed");
                }
                Err(e) => {
                    tracing::error!(
                        media_id = %asset.id,
                        storage_key = %asset.storage_key,
                        error = %e,
                        "Video processing failed"
                    );
                    self.media.fail_processing(asset.id).await?;
                    failed += 1;
                }
            }
        }

        if processed > 0 || failed > 0 {
            tracing::info!(processed, failed, "Transcoding sweep finished");
        }
        Ok(())
    }
}
