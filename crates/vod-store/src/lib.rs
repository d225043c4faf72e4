//! Durable state store for videos and jobs, backed by Postgres.
//!
//! This crate provides:
//! - Per-id CRUD for the `Video` and `Job` entities
//! - Status-marking writes used by the dispatcher and worker
//! - A distinguished `NotFound` outcome separate from infrastructure errors
//!
//! Writes are independent per-row statements; there is no transaction
//! spanning the two tables. Callers must tolerate the window where a job
//! is completed before its video is marked ready.

pub mod error;
pub mod job_store;
pub mod video_store;

pub use error::{StoreError, StoreResult};
pub use job_store::JobStore;
pub use video_store::VideoStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection URL
    pub database_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Connection acquire timeout
    pub acquire_timeout: Duration,
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| StoreError::config("DATABASE_URL not set"))?,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_secs(
                std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        })
    }
}

/// Aggregate handle over both repositories, sharing one pool.
#[derive(Clone)]
pub struct Store {
    pub videos: VideoStore,
    pub jobs: JobStore,
}

impl Store {
    /// Connect to Postgres and build both repositories.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        Ok(Self::from_pool(pool))
    }

    /// Build from an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            videos: VideoStore::new(pool.clone()),
            jobs: JobStore::new(pool),
        }
    }
}
