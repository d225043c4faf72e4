//! Worker configuration.

use std::time::Duration;
use uuid::Uuid;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Consumer name within the bus consumer group; unique per process
    pub consumer_name: String,
    /// Bounded wait for one bus poll
    pub poll_block: Duration,
    /// Pause after a transient poll error before polling again
    pub poll_backoff: Duration,
    /// Hard wall-clock deadline per job, measured from the start of
    /// processing; expiry aborts the pipeline and its sub-operations
    pub job_timeout: Duration,
    /// Parent directory for per-job scratch workspaces
    pub work_dir: String,
    /// Base path prepended to output object keys (may be empty)
    pub output_base: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            consumer_name: format!("worker-{}", Uuid::new_v4()),
            poll_block: Duration::from_millis(5000),
            poll_backoff: Duration::from_secs(2),
            job_timeout: Duration::from_secs(30 * 60),
            work_dir: "/tmp/vod".to_string(),
            output_base: String::new(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            consumer_name: std::env::var("WORKER_CONSUMER_NAME")
                .unwrap_or(defaults.consumer_name),
            poll_block: Duration::from_millis(
                std::env::var("WORKER_POLL_BLOCK_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5000),
            ),
            poll_backoff: Duration::from_secs(
                std::env::var("WORKER_POLL_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30 * 60),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            output_base: std::env::var("WORKER_OUTPUT_BASE").unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deadline_is_thirty_minutes() {
        let config = WorkerConfig::default();
        assert_eq!(config.job_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn consumer_names_are_process_unique() {
        let a = WorkerConfig::default();
        let b = WorkerConfig::default();
        assert_ne!(a.consumer_name, b.consumer_name);
    }
}
