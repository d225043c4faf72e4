//! Job dispatch: persist first, then publish.
//!
//! The job row is the source of truth. It is written before the bus
//! publish so a crash between the two leaves a `queued` row that an
//! operator can re-submit, never a message for a job that does not
//! exist.

use std::sync::Arc;

use tracing::{info, warn};

use vod_bus::{JobBus, TranscodeJobMessage};
use vod_models::{Job, JobId, JobStatus, VideoId};
use vod_store::Store;

use crate::error::{ApiError, ApiResult};

/// What the caller gets back from a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub video_id: VideoId,
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Creates jobs and hands them to the message bus.
pub struct DispatchService {
    store: Store,
    bus: Arc<JobBus>,
}

impl DispatchService {
    pub fn new(store: Store, bus: Arc<JobBus>) -> Self {
        Self { store, bus }
    }

    /// Submit a transcode job for a video.
    ///
    /// The video must exist; its `input_key` is frozen into the job so
    /// later edits to the video cannot change what the worker reads. A
    /// publish failure after the row is written surfaces as 502 with the
    /// row left `queued`.
    pub async fn submit(&self, video_id: &VideoId, pipeline: Option<String>) -> ApiResult<SubmitReceipt> {
        let video = self.store.videos.get(video_id).await?;

        let job = Job::new(video.id.clone(), &video.input_key, pipeline);
        self.store.jobs.create(&job).await?;

        // Pointer update only; the job row already stands on its own.
        if let Err(e) = self.store.videos.set_latest_job(video_id, &job.id).await {
            warn!(video_id = %video_id, job_id = %job.id, error = %e, "Failed to set latest job pointer");
        }

        let message = TranscodeJobMessage {
            job_id: job.id.clone(),
            video_id: video.id.clone(),
            input_key: job.input_key.clone(),
            pipeline: job.pipeline.clone(),
        };

        let message_id = self
            .bus
            .publish(&message)
            .await
            .map_err(|e| ApiError::unavailable(format!("failed to publish job: {e}")))?;

        info!(
            job_id = %job.id,
            video_id = %video_id,
            message_id = %message_id,
            "Dispatched transcode job"
        );

        Ok(SubmitReceipt {
            video_id: video.id,
            job_id: job.id,
            status: job.status,
        })
    }
}
