//! Database repositories for the data access layer.
//!
//! Each repository owns the queries for one domain entity: `MediaRepository`
//! for asset records and the processing state machine, and
//! `UploadSessionRepository` for chunked upload bookkeeping. All queries use
//! runtime-checked sqlx calls; the state-machine transitions run as single
//! conditional UPDATE statements so concurrent workers cannot double-claim.

pub mod media;
pub mod upload_session;

pub use media::{MediaRepository, NewMediaAsset};
pub use upload_session::UploadSessionRepository;

/// Embedded migrations, run by the API binary at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
