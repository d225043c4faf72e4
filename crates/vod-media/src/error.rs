//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while invoking the codec tool.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg failed (exit code {exit_code:?}): {diagnostics}")]
    FfmpegFailed {
        exit_code: Option<i32>,
        /// Captured stdout+stderr of the tool, for error reporting
        diagnostics: String,
    },

    #[error("Master manifest missing after transcode: {}", .0.display())]
    MasterManifestMissing(PathBuf),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
