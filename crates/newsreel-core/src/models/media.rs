use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::error::AppError;

/// Media type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaType::Image => write!(f, "image"),
            MediaType::Video => write!(f, "video"),
        }
    }
}

/// Background processing lifecycle for a video asset.
///
/// Valid transitions: `Pending -> Processing -> {Completed, Failed}`.
/// Terminal states never auto-transition; the only sanctioned regression is
/// an explicit administrative re-enqueue (`Failed -> Pending`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "processing_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    /// Whether moving from `self` to `next` is a forward transition of the
    /// state machine. Re-enqueue (`Failed -> Pending`) is handled separately
    /// and deliberately not covered here.
    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Processing, Completed) | (Processing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingStatus::Pending => write!(f, "pending"),
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ProcessingStatus::Pending),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

/// Probed video metadata written by the worker on successful processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: i32,
    pub height: i32,
}

/// A stored media asset (image or video).
///
/// `duration`/`width`/`height` stay null until the worker probes the file;
/// `uploader_role` is a snapshot taken at upload time so later role changes do
/// not affect ownership checks retroactively. `owner_ref` optionally ties the
/// asset to the content entity (e.g. an article) that embeds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MediaAsset {
    pub id: Uuid,
    pub media_type: MediaType,
    pub storage_key: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub content_type: String,
    pub file_size: i64,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub processing_status: ProcessingStatus,
    pub uploader_id: Uuid,
    pub uploader_role: String,
    pub owner_ref: Option<Uuid>,
    pub is_public: bool,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaAsset {
    /// Initial status for a freshly created asset: images skip the pipeline
    /// entirely, only videos wait for the worker.
    pub fn initial_status(media_type: MediaType) -> ProcessingStatus {
        match media_type {
            MediaType::Image => ProcessingStatus::Completed,
            MediaType::Video => ProcessingStatus::Pending,
        }
    }

    /// Deletion rule: the uploader, or any elevated role.
    pub fn can_be_deleted_by(&self, user_id: Uuid, elevated: bool) -> bool {
        elevated || self.uploader_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_allowed() {
        use ProcessingStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
    }

    #[test]
    fn regressions_and_skips_rejected() {
        use ProcessingStatus::*;
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states() {
        assert!(ProcessingStatus::Completed.is_terminal());
        assert!(ProcessingStatus::Failed.is_terminal());
        assert!(!ProcessingStatus::Pending.is_terminal());
        assert!(!ProcessingStatus::Processing.is_terminal());
    }

    #[test]
    fn status_parses_the_four_valid_values_only() {
        assert_eq!(
            "pending".parse::<ProcessingStatus>().unwrap(),
            ProcessingStatus::Pending
        );
        assert_eq!(
            "COMPLETED".parse::<ProcessingStatus>().unwrap(),
            ProcessingStatus::Completed
        );
        let err = "archived".parse::<ProcessingStatus>().unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus(s) if s == "archived"));
    }

    #[test]
    fn only_the_uploader_or_elevated_may_delete() {
        let uploader = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let asset = MediaAsset {
            id: Uuid::new_v4(),
            media_type: MediaType::Image,
            storage_key: "images/a.jpg".to_string(),
            url: "http://localhost:4000/files/images/a.jpg".to_string(),
            thumbnail_url: None,
            content_type: "image/jpeg".to_string(),
            file_size: 1024,
            duration: None,
            width: None,
            height: None,
            processing_status: ProcessingStatus::Completed,
            uploader_id: uploader,
            uploader_role: "journalist".to_string(),
            owner_ref: None,
            is_public: true,
            caption: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(asset.can_be_deleted_by(uploader, false));
        assert!(asset.can_be_deleted_by(stranger, true));
        assert!(!asset.can_be_deleted_by(stranger, false));
    }

    #[test]
    fn images_start_completed_videos_start_pending() {
        assert_eq!(
            MediaAsset::initial_status(MediaType::Image),
            ProcessingStatus::Completed
        );
        assert_eq!(
            MediaAsset::initial_status(MediaType::Video),
            ProcessingStatus::Pending
        );
    }
}
