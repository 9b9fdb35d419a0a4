//! HTTP error response conversion.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! (`AppError`, `StorageError`, `ValidationError`) convert into `HttpAppError`
//! so every failure renders as the same JSON envelope with `success: false`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use newsreel_core::{AppError, ErrorMetadata, LogLevel, ValidationError};
use newsreel_storage::StorageError;
use serde::Serialize;
use utoipa::ToSchema;

/// Uniform error envelope. `success` is always false; clients branch on it
/// without inspecting status codes.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub recoverable: bool,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.into(),
            details: None,
            recoverable: false,
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse. Needed because of
/// Rust's orphan rules: IntoResponse is external and AppError lives in
/// newsreel-core.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::SizeMismatch { actual, expected } => AppError::InvalidInput(format!(
                "Assembled size {} does not match declared size {}",
                actual, expected
            )),
            StorageError::WriteFailed(msg)
            | StorageError::ReadFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::ConfigError(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
        };
        HttpAppError(app)
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        let app = match err {
            ValidationError::FileTooLarge { size, max } => {
                AppError::PayloadTooLarge(format!("{} bytes exceeds max {} bytes", size, max))
            }
            ValidationError::ChunkTooLarge { size, max } => {
                AppError::PayloadTooLarge(format!("Chunk of {} bytes exceeds max {} bytes", size, max))
            }
            ValidationError::InvalidContentType {
                content_type,
                allowed,
            } => AppError::InvalidFileType(format!(
                "Unsupported content type '{}', allowed: {:?}",
                content_type, allowed
            )),
            ValidationError::EmptyFile => AppError::InvalidInput("File is empty".to_string()),
        };
        HttpAppError(app)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details are hidden in production and for sensitive errors.
        let details = if is_production_env() || app_error.is_sensitive() {
            None
        } else {
            Some(app_error.detailed_message())
        };

        let body = Json(ErrorResponse {
            success: false,
            message: app_error.client_message(),
            code: app_error.error_code().to_string(),
            details,
            recoverable: app_error.is_recoverable(),
        });

        let mut response = (status, body).into_response();

        // A 416 carries the real size so range clients can recover.
        if let AppError::RangeNotSatisfiable { file_size, .. } = &self.0 {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", file_size)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_maps_to_not_found() {
        let HttpAppError(app_err) = StorageError::NotFound("missing.mp4".to_string()).into();
        match app_err {
            AppError::NotFound(msg) => assert_eq!(msg, "missing.mp4"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn storage_size_mismatch_is_a_client_error() {
        let HttpAppError(app_err) = StorageError::SizeMismatch {
            actual: 900,
            expected: 1000,
        }
        .into();
        match app_err {
            AppError::InvalidInput(msg) => {
                assert!(msg.contains("900"));
                assert!(msg.contains("1000"));
            }
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn validation_too_large_maps_to_payload_too_large() {
        let HttpAppError(app_err) = ValidationError::FileTooLarge {
            size: 2000,
            max: 1000,
        }
        .into();
        assert!(matches!(app_err, AppError::PayloadTooLarge(_)));
        assert_eq!(app_err.http_status_code(), 413);
    }

    #[test]
    fn envelope_always_reports_failure() {
        let response = ErrorResponse::new("Media not found", "NOT_FOUND");
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json.get("success"), Some(&serde_json::Value::Bool(false)));
        assert_eq!(
            json.get("message").and_then(|v| v.as_str()),
            Some("Media not found")
        );
        assert!(json.get("details").is_none());
    }
}
