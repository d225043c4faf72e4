//! Video entity and status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::JobId;

/// Unique identifier for a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
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

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Video lifecycle status.
///
/// Moves `uploaded -> processing -> {ready, failed}`; recovery from
/// `failed` happens through a new job submission, never by mutating the
/// status backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Row exists, bytes may not have arrived yet
    #[default]
    Uploaded,
    /// A worker picked up the latest job
    Processing,
    /// Latest job produced a playable output
    Ready,
    /// Latest job failed
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
            VideoStatus::Failed => "failed",
        }
    }

    /// Parse from the database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(VideoStatus::Uploaded),
            "processing" => Some(VideoStatus::Processing),
            "ready" => Some(VideoStatus::Ready),
            "failed" => Some(VideoStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered video.
///
/// Created at upload-presign time, before any bytes exist in object
/// storage. `latest_job_id` tracks the most recently created job once
/// one exists; older jobs remain addressable by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Unique video ID
    pub id: VideoId,

    /// Display title
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Original filename as provided by the client
    pub filename: String,

    /// Content type of the source object (e.g. video/mp4)
    pub content_type: String,

    /// Object-storage key of the source bytes
    pub input_key: String,

    /// Object-storage key of the thumbnail
    pub thumbnail_key: String,

    /// Most recently created job, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_job_id: Option<JobId>,

    /// Lifecycle status
    pub status: VideoStatus,

    /// Error message from the latest failed job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a new video row in the `uploaded` state.
    pub fn new(
        id: VideoId,
        title: impl Into<String>,
        description: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        input_key: impl Into<String>,
        thumbnail_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            description: description.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            input_key: input_key.into(),
            thumbnail_key: thumbnail_key.into(),
            latest_job_id: None,
            status: VideoStatus::Uploaded,
            error_msg: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            VideoStatus::Uploaded,
            VideoStatus::Processing,
            VideoStatus::Ready,
            VideoStatus::Failed,
        ] {
            assert_eq!(VideoStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VideoStatus::parse("queued"), None);
    }

    #[test]
    fn new_video_starts_uploaded_without_job() {
        let video = Video::new(
            VideoId::new(),
            "Title",
            "",
            "clip.mp4",
            "video/mp4",
            "inputs/a.mp4",
            "thumbnails/a.jpg",
        );
        assert_eq!(video.status, VideoStatus::Uploaded);
        assert!(video.latest_job_id.is_none());
        assert!(video.error_msg.is_none());
    }
}
