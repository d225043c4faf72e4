//! Worker error types.
//!
//! Pipeline stage failures carry the stage that tripped; all of them
//! converge to a persisted failed state on the job and video rather
//! than crashing the worker.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("workspace setup failed: {0}")]
    WorkspaceFailed(String),

    #[error("fetch input failed: {0}")]
    FetchFailed(String),

    #[error("codec failed: {0}")]
    CodecFailed(String),

    #[error("publish output failed: {0}")]
    PublishFailed(String),

    #[error("finalize failed: {0}")]
    FinalizeFailed(String),

    #[error("processing deadline exceeded after {0} seconds")]
    DeadlineExceeded(u64),

    #[error("store error: {0}")]
    Store(#[from] vod_store::StoreError),

    #[error("storage error: {0}")]
    Storage(#[from] vod_storage::StorageError),

    #[error("bus error: {0}")]
    Bus(#[from] vod_bus::BusError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn workspace_failed(msg: impl Into<String>) -> Self {
        Self::WorkspaceFailed(msg.into())
    }

    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    pub fn codec_failed(msg: impl Into<String>) -> Self {
        Self::CodecFailed(msg.into())
    }

    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::PublishFailed(msg.into())
    }

    pub fn finalize_failed(msg: impl Into<String>) -> Self {
        Self::FinalizeFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_name_their_stage() {
        assert!(WorkerError::fetch_failed("timeout").to_string().contains("fetch input"));
        assert!(WorkerError::codec_failed("boom").to_string().contains("codec"));
        assert!(WorkerError::publish_failed("503").to_string().contains("publish output"));
        assert!(WorkerError::finalize_failed("db").to_string().contains("finalize"));
    }

    #[test]
    fn deadline_message_names_the_limit() {
        let err = WorkerError::DeadlineExceeded(1800);
        assert_eq!(
            err.to_string(),
            "processing deadline exceeded after 1800 seconds"
        );
    }
}
