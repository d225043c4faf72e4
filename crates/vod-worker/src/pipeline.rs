//! The transcode pipeline: fetch, encode, publish, finalize.
//!
//! Every stage is independently failable; any failure short-circuits
//! into [`fail_job`], which persists a failed state on both the job and
//! its video. Re-running the pipeline for the same job id converges to
//! the same terminal state: every write is an overwrite keyed by job
//! id, and output objects land under a deterministic prefix.
//!
//! The pipeline talks to its collaborators through [`PipelineServices`]
//! rather than concrete handles, so the skip/failure paths can be
//! exercised without a live store, broker or codec tool.

use std::future::Future;
use std::path::Path;

use tempfile::TempDir;
use tracing::{info, warn};

use vod_bus::TranscodeJobMessage;
use vod_media::{rendition_names, MediaResult, MASTER_MANIFEST};
use vod_models::{Job, JobId, JobStatus, VideoId};
use vod_storage::StorageResult;
use vod_store::StoreResult;

use crate::context::best_effort;
use crate::error::{WorkerError, WorkerResult};

/// Progress recorded once the input is on local disk.
const PROGRESS_FETCHED: i32 = 10;
/// Conservative midpoint after the encode finishes, before upload.
const PROGRESS_TRANSCODED: i32 = 70;

/// Everything the pipeline needs from the outside world: store writes,
/// object transfer and the codec invocation. Implemented by
/// [`WorkerContext`](crate::context::WorkerContext) in production.
pub trait PipelineServices {
    /// Parent directory for per-job scratch workspaces.
    fn work_dir(&self) -> &str;
    /// Base path prepended to output object keys (may be empty).
    fn output_base(&self) -> &str;

    fn load_job(&self, id: &JobId) -> impl Future<Output = StoreResult<Job>> + Send;
    fn mark_job_processing(&self, id: &JobId) -> impl Future<Output = StoreResult<()>> + Send;
    fn mark_video_processing(&self, id: &VideoId) -> impl Future<Output = StoreResult<()>> + Send;
    fn record_progress(
        &self,
        id: &JobId,
        progress: i32,
        renditions: &[String],
        master_key: Option<&str>,
        playback_ready: bool,
    ) -> impl Future<Output = StoreResult<()>> + Send;
    fn complete_job(&self, id: &JobId) -> impl Future<Output = StoreResult<()>> + Send;
    fn mark_job_failed(&self, id: &JobId, msg: &str)
        -> impl Future<Output = StoreResult<()>> + Send;
    fn mark_video_ready(&self, id: &VideoId) -> impl Future<Output = StoreResult<()>> + Send;
    fn mark_video_failed(
        &self,
        id: &VideoId,
        msg: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn fetch_input(&self, key: &str, dest: &Path)
        -> impl Future<Output = StorageResult<()>> + Send;
    fn transcode(&self, input: &Path, out_dir: &Path)
        -> impl Future<Output = MediaResult<()>> + Send;
    fn publish_outputs(
        &self,
        dir: &Path,
        prefix: &str,
    ) -> impl Future<Output = StorageResult<usize>> + Send;
}

/// How a pipeline run ended short of failing.
#[derive(Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Full run: output published, job completed, video ready
    Completed { master_key: String },
    /// Re-delivered message for a job already completed; nothing done
    AlreadyCompleted,
    /// Message referenced a job row that does not exist; dropped
    UnknownJob,
}

/// Deterministic output prefix for a job's artifacts.
pub fn output_prefix(base: &str, video_id: &VideoId, job_id: &JobId) -> String {
    format!("{base}outputs/{video_id}/{job_id}/")
}

/// Object key of the master manifest under [`output_prefix`].
pub fn master_key(base: &str, video_id: &VideoId, job_id: &JobId) -> String {
    format!("{}{}", output_prefix(base, video_id, job_id), MASTER_MANIFEST)
}

/// Run the pipeline for one validated message.
///
/// The caller imposes the wall-clock deadline by wrapping this future in
/// a timeout; dropping it kills the in-flight encode and I/O.
pub async fn run_pipeline<S: PipelineServices>(
    svc: &S,
    msg: &TranscodeJobMessage,
) -> WorkerResult<PipelineOutcome> {
    // At-least-once delivery: the same job id may arrive again after a
    // successful run. Terminal completed state must never revert, so
    // look before marking anything.
    match svc.load_job(&msg.job_id).await {
        Ok(job) if job.status == JobStatus::Completed => {
            info!(job_id = %msg.job_id, "Job already completed, skipping re-delivery");
            return Ok(PipelineOutcome::AlreadyCompleted);
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            warn!(job_id = %msg.job_id, "Message references unknown job, dropping");
            return Ok(PipelineOutcome::UnknownJob);
        }
        // Store unreachable: proceed anyway; the bookkeeping writes
        // below are best-effort and the finalize write is the
        // authoritative one.
        Err(e) => warn!(job_id = %msg.job_id, "Pre-flight job read failed: {e}"),
    }

    best_effort(
        svc.mark_job_processing(&msg.job_id).await,
        "job mark processing",
    );
    best_effort(
        svc.mark_video_processing(&msg.video_id).await,
        "video mark processing",
    );

    // Stage 1: isolated, process-unique workspace; removed on every
    // exit path when the TempDir drops.
    tokio::fs::create_dir_all(svc.work_dir())
        .await
        .map_err(|e| WorkerError::workspace_failed(e.to_string()))?;
    let workspace = TempDir::with_prefix_in(format!("transcode-{}-", msg.job_id), svc.work_dir())
        .map_err(|e| WorkerError::workspace_failed(e.to_string()))?;

    // Stage 2: fetch input
    let input_path = workspace.path().join("input.mp4");
    svc.fetch_input(&msg.input_key, &input_path)
        .await
        .map_err(|e| WorkerError::fetch_failed(e.to_string()))?;

    best_effort(
        svc.record_progress(&msg.job_id, PROGRESS_FETCHED, &[], None, false)
            .await,
        "progress after fetch",
    );

    // Stage 3: transcode
    let hls_dir = workspace.path().join("hls");
    svc.transcode(&input_path, &hls_dir)
        .await
        .map_err(|e| WorkerError::codec_failed(e.to_string()))?;

    // Stage 4: midpoint checkpoint, listing only the rendition known
    // complete first; advisory telemetry, not authoritative.
    let lowest = rendition_names().into_iter().take(1).collect::<Vec<_>>();
    best_effort(
        svc.record_progress(&msg.job_id, PROGRESS_TRANSCODED, &lowest, None, false)
            .await,
        "progress after transcode",
    );

    // Stage 5: publish output
    let prefix = output_prefix(svc.output_base(), &msg.video_id, &msg.job_id);
    let master = master_key(svc.output_base(), &msg.video_id, &msg.job_id);
    svc.publish_outputs(&hls_dir, &prefix)
        .await
        .map_err(|e| WorkerError::publish_failed(e.to_string()))?;

    // Stage 6: finalize. This write is authoritative; its failure is a
    // pipeline failure so the job is never left stuck in processing.
    svc.record_progress(&msg.job_id, 100, &rendition_names(), Some(&master), true)
        .await
        .map_err(|e| WorkerError::finalize_failed(e.to_string()))?;

    best_effort(svc.complete_job(&msg.job_id).await, "job mark completed");
    best_effort(
        svc.mark_video_ready(&msg.video_id).await,
        "video mark ready",
    );

    info!(job_id = %msg.job_id, master_key = %master, "Job completed");
    Ok(PipelineOutcome::Completed { master_key: master })
}

/// Persist the failed state for both entities. Best-effort: a worker
/// must survive even when the store is unreachable at failure time.
pub async fn fail_job<S: PipelineServices>(svc: &S, msg: &TranscodeJobMessage, err: &WorkerError) {
    tracing::error!(
        job_id = %msg.job_id,
        video_id = %msg.video_id,
        "Job failed: {err}"
    );

    let reason = err.to_string();
    best_effort(
        svc.mark_job_failed(&msg.job_id, &reason).await,
        "job mark failed",
    );
    best_effort(
        svc.mark_video_failed(&msg.video_id, &reason).await,
        "video mark failed",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use vod_media::MediaError;
    use vod_storage::StorageError;
    use vod_store::StoreError;

    #[test]
    fn output_prefix_is_deterministic_per_job() {
        let video = VideoId::from_string("v1");
        let job = JobId::from_string("j1");
        assert_eq!(output_prefix("", &video, &job), "outputs/v1/j1/");
        assert_eq!(output_prefix("vod/", &video, &job), "vod/outputs/v1/j1/");
    }

    #[test]
    fn master_key_points_at_the_master_manifest() {
        let video = VideoId::from_string("v1");
        let job = JobId::from_string("j1");
        assert_eq!(master_key("", &video, &job), "outputs/v1/j1/master.m3u8");
    }

    #[test]
    fn checkpoint_values_are_ordered() {
        assert!(PROGRESS_FETCHED < PROGRESS_TRANSCODED);
        assert!(PROGRESS_TRANSCODED < 100);
    }

    #[derive(Default)]
    struct Calls {
        progress: Vec<(i32, Vec<String>, Option<String>, bool)>,
        job_processing: u32,
        video_processing: u32,
        completed: bool,
        video_ready: bool,
        job_failed: Option<String>,
        video_failed: Option<String>,
    }

    /// In-memory collaborators recording every write the pipeline asks
    /// for. The codec step just drops a master manifest on disk.
    struct FakeServices {
        root: tempfile::TempDir,
        work_dir: String,
        job: Option<Job>,
        fail_transcode: bool,
        fail_publish: bool,
        calls: Mutex<Calls>,
    }

    impl FakeServices {
        fn new(job: Option<Job>) -> Self {
            let root = tempfile::tempdir().unwrap();
            let work_dir = root.path().to_str().unwrap().to_string();
            Self {
                root,
                work_dir,
                job,
                fail_transcode: false,
                fail_publish: false,
                calls: Mutex::new(Calls::default()),
            }
        }
    }

    impl PipelineServices for FakeServices {
        fn work_dir(&self) -> &str {
            &self.work_dir
        }

        fn output_base(&self) -> &str {
            ""
        }

        async fn load_job(&self, id: &JobId) -> StoreResult<Job> {
            match &self.job {
                Some(job) => Ok(job.clone()),
                None => Err(StoreError::not_found(format!("job {id}"))),
            }
        }

        async fn mark_job_processing(&self, _id: &JobId) -> StoreResult<()> {
            self.calls.lock().unwrap().job_processing += 1;
            Ok(())
        }

        async fn mark_video_processing(&self, _id: &VideoId) -> StoreResult<()> {
            self.calls.lock().unwrap().video_processing += 1;
            Ok(())
        }

        async fn record_progress(
            &self,
            _id: &JobId,
            progress: i32,
            renditions: &[String],
            master_key: Option<&str>,
            playback_ready: bool,
        ) -> StoreResult<()> {
            self.calls.lock().unwrap().progress.push((
                progress,
                renditions.to_vec(),
                master_key.map(str::to_string),
                playback_ready,
            ));
            Ok(())
        }

        async fn complete_job(&self, _id: &JobId) -> StoreResult<()> {
            self.calls.lock().unwrap().completed = true;
            Ok(())
        }

        async fn mark_job_failed(&self, _id: &JobId, msg: &str) -> StoreResult<()> {
            self.calls.lock().unwrap().job_failed = Some(msg.to_string());
            Ok(())
        }

        async fn mark_video_ready(&self, _id: &VideoId) -> StoreResult<()> {
            self.calls.lock().unwrap().video_ready = true;
            Ok(())
        }

        async fn mark_video_failed(&self, _id: &VideoId, msg: &str) -> StoreResult<()> {
            self.calls.lock().unwrap().video_failed = Some(msg.to_string());
            Ok(())
        }

        async fn fetch_input(&self, _key: &str, dest: &Path) -> StorageResult<()> {
            tokio::fs::write(dest, b"input").await?;
            Ok(())
        }

        async fn transcode(&self, _input: &Path, out_dir: &Path) -> MediaResult<()> {
            if self.fail_transcode {
                return Err(MediaError::FfmpegFailed {
                    exit_code: Some(1),
                    diagnostics: "moov atom not found".to_string(),
                });
            }
            tokio::fs::create_dir_all(out_dir).await?;
            tokio::fs::write(out_dir.join(MASTER_MANIFEST), b"#EXTM3U").await?;
            Ok(())
        }

        async fn publish_outputs(&self, _dir: &Path, _prefix: &str) -> StorageResult<usize> {
            if self.fail_publish {
                return Err(StorageError::upload_failed("503 from storage"));
            }
            Ok(1)
        }
    }

    fn message_for(job: &Job) -> TranscodeJobMessage {
        TranscodeJobMessage {
            job_id: job.id.clone(),
            video_id: job.video_id.clone(),
            input_key: job.input_key.clone(),
            pipeline: job.pipeline.clone(),
        }
    }

    #[tokio::test]
    async fn full_run_completes_job_and_readies_video() {
        let job = Job::new(VideoId::from_string("v1"), "inputs/a.mp4", None);
        let msg = message_for(&job);
        let svc = FakeServices::new(Some(job));

        let outcome = run_pipeline(&svc, &msg).await.unwrap();
        let expected_master = format!("outputs/v1/{}/master.m3u8", msg.job_id);
        assert_eq!(
            outcome,
            PipelineOutcome::Completed {
                master_key: expected_master.clone()
            }
        );

        let calls = svc.calls.lock().unwrap();
        assert!(calls.completed);
        assert!(calls.video_ready);
        assert!(calls.job_failed.is_none());

        let finalize = calls.progress.last().unwrap();
        assert_eq!(finalize.0, 100);
        assert_eq!(finalize.1, rendition_names());
        assert_eq!(finalize.2.as_deref(), Some(expected_master.as_str()));
        assert!(finalize.3);
    }

    #[tokio::test]
    async fn progress_checkpoints_never_decrease() {
        let job = Job::new(VideoId::from_string("v1"), "inputs/a.mp4", None);
        let msg = message_for(&job);
        let svc = FakeServices::new(Some(job));

        run_pipeline(&svc, &msg).await.unwrap();

        let calls = svc.calls.lock().unwrap();
        let values: Vec<i32> = calls.progress.iter().map(|c| c.0).collect();
        assert_eq!(values, vec![10, 70, 100]);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));

        // The midpoint lists only the lowest rung and stays private.
        let midpoint = &calls.progress[1];
        assert_eq!(midpoint.1, vec!["480p".to_string()]);
        assert!(midpoint.2.is_none());
        assert!(!midpoint.3);
    }

    #[tokio::test]
    async fn completed_job_redelivery_writes_nothing() {
        let mut job = Job::new(VideoId::from_string("v1"), "inputs/a.mp4", None);
        job.status = JobStatus::Completed;
        let msg = message_for(&job);
        let svc = FakeServices::new(Some(job));

        let outcome = run_pipeline(&svc, &msg).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::AlreadyCompleted);

        let calls = svc.calls.lock().unwrap();
        assert_eq!(calls.job_processing, 0);
        assert_eq!(calls.video_processing, 0);
        assert!(calls.progress.is_empty());
        assert!(!calls.completed);
        assert!(calls.job_failed.is_none());
    }

    #[tokio::test]
    async fn unknown_job_is_dropped_without_writes() {
        let job = Job::new(VideoId::from_string("v1"), "inputs/a.mp4", None);
        let msg = message_for(&job);
        let svc = FakeServices::new(None);

        let outcome = run_pipeline(&svc, &msg).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::UnknownJob);

        let calls = svc.calls.lock().unwrap();
        assert_eq!(calls.job_processing, 0);
        assert!(calls.progress.is_empty());
    }

    #[tokio::test]
    async fn codec_failure_marks_both_entities_failed() {
        let job = Job::new(VideoId::from_string("v1"), "inputs/a.mp4", None);
        let msg = message_for(&job);
        let mut svc = FakeServices::new(Some(job));
        svc.fail_transcode = true;

        let err = run_pipeline(&svc, &msg).await.unwrap_err();
        assert!(matches!(err, WorkerError::CodecFailed(_)));
        assert!(err.to_string().contains("moov atom not found"));

        fail_job(&svc, &msg, &err).await;

        let calls = svc.calls.lock().unwrap();
        let reason = calls.job_failed.as_deref().unwrap();
        assert!(!reason.is_empty());
        assert!(reason.contains("moov atom not found"));
        assert!(calls.video_failed.is_some());
        assert!(!calls.completed);
        assert!(!calls.video_ready);
    }

    #[tokio::test]
    async fn publish_failure_is_classified_as_publish_stage() {
        let job = Job::new(VideoId::from_string("v1"), "inputs/a.mp4", None);
        let msg = message_for(&job);
        let mut svc = FakeServices::new(Some(job));
        svc.fail_publish = true;

        let err = run_pipeline(&svc, &msg).await.unwrap_err();
        assert!(matches!(err, WorkerError::PublishFailed(_)));

        let calls = svc.calls.lock().unwrap();
        assert!(!calls.completed);
        assert!(!calls.video_ready);
    }

    #[tokio::test]
    async fn unusable_work_dir_is_a_workspace_failure() {
        let job = Job::new(VideoId::from_string("v1"), "inputs/a.mp4", None);
        let msg = message_for(&job);
        let mut svc = FakeServices::new(Some(job));

        // Point the workspace parent at a regular file.
        let blocker = svc.root.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        svc.work_dir = blocker.to_str().unwrap().to_string();

        let err = run_pipeline(&svc, &msg).await.unwrap_err();
        assert!(matches!(err, WorkerError::WorkspaceFailed(_)));
    }
}
