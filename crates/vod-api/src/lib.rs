//! Axum HTTP API server.
//!
//! This crate provides:
//! - Upload presigning (which registers the video)
//! - Job submission through the dispatch service
//! - Playback status reads for client polling
//! - Video get/list

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
