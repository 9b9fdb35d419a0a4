use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Lifecycle of a chunked upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "upload_session_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Chunks are still arriving (or all have arrived but assembly has not run).
    Receiving,
    /// Assembly ran and the result did not match the declared size. Fragments
    /// are retained until the session expires so the client can retry.
    FailedAssembly,
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SessionStatus::Receiving => write!(f, "receiving"),
            SessionStatus::FailedAssembly => write!(f, "failed_assembly"),
        }
    }
}

/// An in-flight multi-chunk upload.
///
/// The session is created on the first chunk and destroyed on successful
/// assembly or by the expiry sweep. `received_chunks` is a set: re-delivered
/// indices are recorded once, and the fragment slot is simply overwritten.
/// There is deliberately no "assembled" status - a successful assembly deletes
/// the row, which is what makes assembly idempotent (a repeat attempt finds
/// nothing to assemble).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct UploadSession {
    pub upload_id: String,
    pub total_chunks: i32,
    pub received_chunks: Vec<i32>,
    pub total_size: i64,
    pub content_type: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UploadSession {
    /// A session is ready to assemble iff the received set is exactly
    /// `{0..total_chunks-1}`. Arrival order is irrelevant.
    pub fn is_complete(&self) -> bool {
        if self.received_chunks.len() != self.total_chunks as usize {
            return false;
        }
        let mut sorted = self.received_chunks.clone();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.len() == self.total_chunks as usize
            && sorted.first() == Some(&0)
            && sorted.last() == Some(&(self.total_chunks - 1))
    }

    /// Chunk indices in assembly order (0,1,2,...).
    pub fn ordered_indices(&self) -> Vec<i32> {
        (0..self.total_chunks).collect()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(total: i32, received: Vec<i32>) -> UploadSession {
        let now = Utc::now();
        UploadSession {
            upload_id: "u1".to_string(),
            total_chunks: total,
            received_chunks: received,
            total_size: 6 * 1024 * 1024,
            content_type: "video/mp4".to_string(),
            status: SessionStatus::Receiving,
            created_at: now,
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn complete_regardless_of_arrival_order() {
        assert!(session(3, vec![1, 0, 2]).is_complete());
        assert!(session(3, vec![2, 1, 0]).is_complete());
        assert!(session(1, vec![0]).is_complete());
    }

    #[test]
    fn incomplete_when_chunks_missing() {
        assert!(!session(3, vec![0, 1]).is_complete());
        assert!(!session(3, vec![]).is_complete());
    }

    #[test]
    fn incomplete_when_indices_out_of_range_or_duplicated() {
        // index 3 for a 3-chunk session means index 2 never arrived
        assert!(!session(3, vec![0, 1, 3]).is_complete());
        // duplicates padding the count must not fake completeness
        assert!(!session(3, vec![0, 1, 1]).is_complete());
    }

    #[test]
    fn ordered_indices_are_ascending() {
        assert_eq!(session(3, vec![2, 0, 1]).ordered_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn expiry_check() {
        let s = session(3, vec![0]);
        assert!(!s.is_expired(Utc::now()));
        assert!(s.is_expired(s.expires_at + Duration::seconds(1)));
    }
}
