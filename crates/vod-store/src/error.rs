//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur against the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store misconfigured: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn corrupt_row(msg: impl Into<String>) -> Self {
        Self::CorruptRow(msg.into())
    }

    /// True when the error means the referenced row does not exist,
    /// as opposed to the store being unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
            || matches!(self, StoreError::Database(sqlx::Error::RowNotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished_from_infrastructure() {
        assert!(StoreError::not_found("video abc").is_not_found());
        assert!(StoreError::Database(sqlx::Error::RowNotFound).is_not_found());
        assert!(!StoreError::config("DATABASE_URL not set").is_not_found());
        assert!(!StoreError::Database(sqlx::Error::PoolTimedOut).is_not_found());
    }
}
