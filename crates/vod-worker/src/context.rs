//! Worker context: every collaborator the pipeline needs, constructed
//! once and passed explicitly into each stage. No implicit globals.

use std::fmt::Display;
use std::path::Path;

use tracing::warn;

use vod_bus::JobBus;
use vod_media::{run_hls_transcode, MediaResult};
use vod_models::{Job, JobId, VideoId};
use vod_storage::{ObjectStore, StorageResult};
use vod_store::{Store, StoreResult};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::pipeline::PipelineServices;

/// Long-lived handles shared by the driver loop and pipeline stages.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub store: Store,
    pub storage: ObjectStore,
    pub bus: JobBus,
}

impl WorkerContext {
    pub fn new(config: WorkerConfig, store: Store, storage: ObjectStore, bus: JobBus) -> Self {
        Self {
            config,
            store,
            storage,
            bus,
        }
    }

    /// Connect every collaborator from environment configuration.
    pub async fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let store_config = vod_store::StoreConfig::from_env()?;
        let store = Store::connect(&store_config).await?;
        let storage = ObjectStore::from_env()?;
        let bus = JobBus::from_env()?;
        Ok(Self::new(config, store, storage, bus))
    }
}

impl PipelineServices for WorkerContext {
    fn work_dir(&self) -> &str {
        &self.config.work_dir
    }

    fn output_base(&self) -> &str {
        &self.config.output_base
    }

    async fn load_job(&self, id: &JobId) -> StoreResult<Job> {
        self.store.jobs.get(id).await
    }

    async fn mark_job_processing(&self, id: &JobId) -> StoreResult<()> {
        self.store.jobs.mark_processing(id).await
    }

    async fn mark_video_processing(&self, id: &VideoId) -> StoreResult<()> {
        self.store.videos.mark_processing(id).await
    }

    async fn record_progress(
        &self,
        id: &JobId,
        progress: i32,
        renditions: &[String],
        master_key: Option<&str>,
        playback_ready: bool,
    ) -> StoreResult<()> {
        self.store
            .jobs
            .update_progress(id, progress, renditions, master_key, playback_ready)
            .await
    }

    async fn complete_job(&self, id: &JobId) -> StoreResult<()> {
        self.store.jobs.mark_completed(id).await
    }

    async fn mark_job_failed(&self, id: &JobId, msg: &str) -> StoreResult<()> {
        self.store.jobs.mark_failed(id, msg).await
    }

    async fn mark_video_ready(&self, id: &VideoId) -> StoreResult<()> {
        self.store.videos.mark_ready(id).await
    }

    async fn mark_video_failed(&self, id: &VideoId, msg: &str) -> StoreResult<()> {
        self.store.videos.mark_failed(id, msg).await
    }

    async fn fetch_input(&self, key: &str, dest: &Path) -> StorageResult<()> {
        self.storage.download_to_file(key, dest).await
    }

    async fn transcode(&self, input: &Path, out_dir: &Path) -> MediaResult<()> {
        run_hls_transcode(input, out_dir).await
    }

    async fn publish_outputs(&self, dir: &Path, prefix: &str) -> StorageResult<usize> {
        self.storage.upload_dir(dir, prefix).await
    }
}

/// Record the outcome of an advisory write without letting its failure
/// propagate. Status bookkeeping (processing marks, progress
/// checkpoints) is telemetry; only pipeline stages decide job fate.
pub fn best_effort<T, E: Display>(result: Result<T, E>, what: &str) {
    if let Err(e) = result {
        warn!("Best-effort write failed ({what}): {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_effort_swallows_errors() {
        // Must not panic or propagate
        best_effort(Err::<(), _>("store unreachable"), "mark processing");
        best_effort(Ok::<_, String>(()), "mark processing");
    }
}
