//! FFmpeg invocation for the fixed HLS transcoding policy.
//!
//! This crate provides:
//! - The rendition ladder (fixed policy, not user-configurable)
//! - The HLS command template
//! - A process runner that captures tool diagnostics and verifies the
//!   master manifest exists before reporting success

pub mod error;
pub mod hls;

pub use error::{MediaError, MediaResult};
pub use hls::{
    build_hls_args, rendition_names, run_hls_transcode, Rendition, MASTER_MANIFEST, RENDITIONS,
};
