//! Job entity and status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{VideoId, DEFAULT_PIPELINE};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Persisted and published (or awaiting publish)
    #[default]
    Queued,
    /// A worker is running the pipeline
    Processing,
    /// Output published and playable
    Completed,
    /// Pipeline failed; `error_msg` holds the cause
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse from the database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Completed jobs are never reprocessed; failed jobs need a new
    /// submission rather than a retry of the same row.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transcoding job.
///
/// `input_key` is copied from the video at creation time so later video
/// mutation cannot change what an in-flight job reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Owning video
    pub video_id: VideoId,

    /// Source object key, frozen at creation
    pub input_key: String,

    /// Pipeline name (currently always "hls")
    pub pipeline: String,

    /// Lifecycle status
    pub status: JobStatus,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,

    /// Master manifest key; set together with `playback_ready`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_master_key: Option<String>,

    /// True once the master manifest and rendition set are servable
    pub playback_ready: bool,

    /// Renditions known to be durably published, in ladder order
    pub available_renditions: Vec<String>,

    /// Progress in percent, non-decreasing while processing
    pub progress: u8,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a queued job for a video.
    pub fn new(video_id: VideoId, input_key: impl Into<String>, pipeline: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            video_id,
            input_key: input_key.into(),
            pipeline: pipeline
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PIPELINE.to_string()),
            status: JobStatus::Queued,
            error_msg: None,
            output_master_key: None,
            playback_ready: false,
            available_renditions: Vec::new(),
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Clamp a progress value to the valid percent range.
pub fn clamp_progress(progress: i32) -> u8 {
    progress.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_queued_with_zero_progress() {
        let job = Job::new(VideoId::new(), "inputs/a.mp4", None);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(job.pipeline, "hls");
        assert!(!job.playback_ready);
        assert!(job.output_master_key.is_none());
    }

    #[test]
    fn blank_pipeline_falls_back_to_default() {
        let job = Job::new(VideoId::new(), "inputs/a.mp4", Some("  ".to_string()));
        assert_eq!(job.pipeline, "hls");

        let job = Job::new(VideoId::new(), "inputs/a.mp4", Some("hls".to_string()));
        assert_eq!(job.pipeline, "hls");
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn progress_clamps_to_percent_range() {
        assert_eq!(clamp_progress(-5), 0);
        assert_eq!(clamp_progress(42), 42);
        assert_eq!(clamp_progress(250), 100);
    }
}
