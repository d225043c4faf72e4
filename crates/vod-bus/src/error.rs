//! Bus error types.

use thiserror::Error;

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Publish failed after {attempts} attempts: {message}")]
    PublishFailed { message: String, attempts: u32 },

    #[error("Malformed message {message_id}: {reason}")]
    Malformed { message_id: String, reason: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BusError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn publish_failed(msg: impl Into<String>, attempts: u32) -> Self {
        Self::PublishFailed {
            message: msg.into(),
            attempts,
        }
    }
}
