//! Application setup: database, storage, state, routes, background jobs.

pub mod database;
pub mod routes;
pub mod server;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use newsreel_core::{Config, MediaValidator};
use newsreel_db::{MediaRepository, UploadSessionRepository};
use newsreel_storage::{LocalStorage, Storage};
use newsreel_worker::{FfprobeProber, Scheduler, SessionExpirySweep, TranscodeSweep};

use crate::services::ChunkAssembler;
use crate::state::{AppState, MediaState};

/// Initialize the application: connect the database, run migrations, wire up
/// state, and build the router. The scheduler is returned unstarted so the
/// caller controls when background jobs begin.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router, Scheduler)> {
    let pool = database::setup_database(&config).await?;

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(
            PathBuf::from(&config.storage_path),
            config.storage_base_url.clone(),
        )
        .await?,
    );

    let repository = MediaRepository::new(pool.clone());
    let sessions = UploadSessionRepository::new(pool.clone());
    let validator = MediaValidator::new(config.upload_policy.clone());
    let assembler = ChunkAssembler::new(
        sessions.clone(),
        repository.clone(),
        storage.clone(),
        config.storage_base_url.clone(),
        config.upload_session_ttl_secs as u64,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        pool,
        media: MediaState {
            repository: repository.clone(),
            sessions: sessions.clone(),
            storage: storage.clone(),
            validator,
            assembler,
        },
    });

    let scheduler = setup_scheduler(&config, repository, sessions, storage);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router, scheduler))
}

fn setup_scheduler(
    config: &Config,
    repository: MediaRepository,
    sessions: UploadSessionRepository,
    storage: Arc<dyn Storage>,
) -> Scheduler {
    let mut scheduler = Scheduler::new();

    let prober = Arc::new(FfprobeProber::new(config.ffprobe_path.clone()));
    scheduler.register(
        "transcode-sweep",
        Duration::from_secs(config.transcode_sweep_interval_secs),
        Arc::new(TranscodeSweep::new(
            repository,
            prober,
            PathBuf::from(&config.storage_path),
        )),
    );

    scheduler.register(
        "session-expiry-sweep",
        Duration::from_secs(config.session_expiry_sweep_interval_secs),
        Arc::new(SessionExpirySweep::new(sessions, storage)),
    );

    scheduler
}
