//! Core domain types for the newsreel media service.
//!
//! Holds the media asset and upload session models, the unified error type,
//! upload policy validation, and environment-driven configuration. No I/O
//! happens here; persistence and HTTP live in the sibling crates.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use validation::{MediaValidator, UploadPolicy, ValidationError};
