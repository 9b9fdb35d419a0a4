//! HTTP surface for the media service: uploads (direct and chunked),
//! listing, status management, deletion, range-aware streaming, and the
//! processing-status poller.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
