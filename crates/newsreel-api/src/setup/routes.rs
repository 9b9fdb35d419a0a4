//! Route configuration.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use newsreel_core::Config;

use crate::handlers;
use crate::state::AppState;

const API_PREFIX: &str = "/api/v0";

/// Build the application router.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    // The largest legitimate request body is a direct video upload; the
    // slack covers multipart framing.
    let policy = &config.upload_policy;
    let body_limit = policy
        .image_max_file_size
        .max(policy.video_max_file_size)
        .max(policy.chunk_max_size)
        + 1024 * 1024;

    let media_routes = Router::new()
        .route("/media", post(handlers::media_upload::upload_media))
        .route("/media", get(handlers::media_get::list_media))
        .route("/media/chunk", post(handlers::chunked_upload::upload_chunk))
        .route("/media/status", get(handlers::media_get::poll_status))
        .route("/media/{id}", get(handlers::media_get::get_media))
        .route("/media/{id}", delete(handlers::media_delete::delete_media))
        .route(
            "/media/{id}/status",
            patch(handlers::media_status::update_status),
        )
        .route(
            "/media/{id}/reenqueue",
            post(handlers::media_status::reenqueue_media),
        )
        .route(
            "/media/{id}/stream",
            get(handlers::video_stream::stream_media),
        );

    let app = Router::new()
        .route("/health", get(health))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .nest(API_PREFIX, media_routes)
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(body_limit))
        // axum's built-in extractor limit caps multipart reads at 2MB; the
        // tower-http layer above is the only limit we want.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(crate::error::ErrorResponse::new("Route not found", "NOT_FOUND")),
    )
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();

        CorsLayer::new()
            .allow_origin(origins?)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    };
    Ok(cors)
}
