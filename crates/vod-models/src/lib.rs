//! Shared data models for the VodForge transcoding orchestrator.
//!
//! This crate provides Serde-serializable types for:
//! - Video and Job entities with their status machines
//! - Typed id newtypes
//! - Filename sanitizing utilities shared by the API layer

pub mod job;
pub mod utils;
pub mod video;

// Re-export common types
pub use job::{Job, JobId, JobStatus};
pub use utils::safe_filename;
pub use video::{Video, VideoId, VideoStatus};

/// The default transcoding pipeline when a submission names none.
pub const DEFAULT_PIPELINE: &str = "hls";
