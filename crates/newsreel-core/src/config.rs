//! Configuration module
//!
//! Environment-driven configuration for the API server, storage layout, upload
//! policy, and background sweeps. Loaded once at startup with
//! [`Config::from_env`]; a `.env` file is honored in development.

use std::env;

use crate::validation::UploadPolicy;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const IMAGE_MAX_SIZE_MB: usize = 10;
const VIDEO_MAX_SIZE_MB: usize = 1024;
const CHUNK_MAX_SIZE_MB: usize = 5;
const TRANSCODE_SWEEP_INTERVAL_SECS: u64 = 10;
const SESSION_EXPIRY_SWEEP_INTERVAL_SECS: u64 = 300;
const UPLOAD_SESSION_TTL_SECS: i64 = 3600;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Root directory for chunk fragments and final media files.
    pub storage_path: String,
    /// Base URL under which stored files are publicly addressable.
    pub storage_base_url: String,
    pub upload_policy: UploadPolicy,
    pub ffprobe_path: String,
    /// Interval between transcode sweep passes.
    pub transcode_sweep_interval_secs: u64,
    /// Interval between upload-session expiry sweep passes. Runs independently
    /// of the transcode sweep.
    pub session_expiry_sweep_interval_secs: u64,
    /// How long a chunk session may sit incomplete before the expiry sweep
    /// removes it together with its fragments.
    pub upload_session_ttl_secs: i64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let upload_policy = UploadPolicy {
            image_max_file_size: env_parse("IMAGE_MAX_SIZE_MB", IMAGE_MAX_SIZE_MB) * 1024 * 1024,
            video_max_file_size: env_parse("VIDEO_MAX_SIZE_MB", VIDEO_MAX_SIZE_MB) * 1024 * 1024,
            chunk_max_size: env_parse("CHUNK_MAX_SIZE_MB", CHUNK_MAX_SIZE_MB) * 1024 * 1024,
            image_allowed_content_types: env_list(
                "IMAGE_ALLOWED_CONTENT_TYPES",
                "image/jpeg,image/png,image/gif,image/webp",
            ),
            video_allowed_content_types: env_list(
                "VIDEO_ALLOWED_CONTENT_TYPES",
                "video/mp4,video/quicktime,video/webm",
            ),
        };

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            storage_path: env::var("MEDIA_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/media".to_string()),
            storage_base_url: env::var("MEDIA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/files".to_string()),
            upload_policy,
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            transcode_sweep_interval_secs: env_parse(
                "TRANSCODE_SWEEP_INTERVAL_SECS",
                TRANSCODE_SWEEP_INTERVAL_SECS,
            ),
            session_expiry_sweep_interval_secs: env_parse(
                "SESSION_EXPIRY_SWEEP_INTERVAL_SECS",
                SESSION_EXPIRY_SWEEP_INTERVAL_SECS,
            ),
            upload_session_ttl_secs: env_parse("UPLOAD_SESSION_TTL_SECS", UPLOAD_SESSION_TTL_SECS),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_on_missing_or_garbage() {
        assert_eq!(env_parse("NEWSREEL_TEST_UNSET_VAR", 42u64), 42);
    }

    #[test]
    fn env_list_splits_and_lowercases() {
        let list = env_list("NEWSREEL_TEST_UNSET_LIST", "Video/MP4, video/webm");
        assert_eq!(list, vec!["video/mp4".to_string(), "video/webm".to_string()]);
    }
}
