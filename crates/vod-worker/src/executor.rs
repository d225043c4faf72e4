//! Sequential driver loop.
//!
//! One worker process runs one loop: poll with a bounded wait, process
//! a single message to completion, poll again. There is no intra-process
//! job concurrency; horizontal scale is more worker processes on the
//! same consumer group.

use std::sync::Arc;

use tracing::{info, warn};

use vod_bus::{Delivery, TranscodeJobMessage};

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::{fail_job, run_pipeline};

/// Driver over the message bus.
pub struct Worker {
    ctx: Arc<WorkerContext>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl Worker {
    /// Create a new worker around an already-connected context.
    pub fn new(ctx: WorkerContext) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        Self {
            ctx: Arc::new(ctx),
            shutdown,
        }
    }

    /// Signal the loop to stop after the in-flight message.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run the driver loop until shutdown.
    ///
    /// Transient poll errors are logged and the loop continues after a
    /// short pause; nothing that happens to a single message may take
    /// the process down.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            consumer = %self.ctx.config.consumer_name,
            "Starting worker loop"
        );

        self.ctx.bus.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let block_ms = self.ctx.config.poll_block.as_millis() as u64;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping worker loop");
                        break;
                    }
                }
                polled = self.ctx.bus.poll(&self.ctx.config.consumer_name, block_ms) => {
                    match polled {
                        Ok(Some(delivery)) => self.handle_delivery(delivery).await,
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Bus poll failed: {e}");
                            tokio::time::sleep(self.ctx.config.poll_backoff).await;
                        }
                    }
                }
            }
        }

        info!("Worker loop stopped");
        Ok(())
    }

    /// Hand one delivery to the pipeline.
    ///
    /// The message is acknowledged on hand-off: at-least-once semantics
    /// are accepted and the pipeline is idempotent per job id. Messages
    /// with blank required fields are dropped here, never retried.
    async fn handle_delivery(&self, delivery: Delivery) {
        if let Err(e) = self.ctx.bus.ack(&delivery.message_id).await {
            warn!(message_id = %delivery.message_id, "Ack failed: {e}");
        }

        let msg = delivery.message;
        if let Err(reason) = msg.validate() {
            warn!(
                job_id = %msg.job_id,
                video_id = %msg.video_id,
                "Dropping invalid message: {reason}"
            );
            return;
        }

        self.process_one(&msg).await;
    }

    /// Process one message under the hard wall-clock deadline.
    async fn process_one(&self, msg: &TranscodeJobMessage) {
        let deadline = self.ctx.config.job_timeout;

        match tokio::time::timeout(deadline, run_pipeline(self.ctx.as_ref(), msg)).await {
            Ok(Ok(outcome)) => {
                info!(job_id = %msg.job_id, ?outcome, "Pipeline finished");
            }
            Ok(Err(err)) => fail_job(self.ctx.as_ref(), msg, &err).await,
            Err(_) => {
                // Dropping the pipeline future kills the ffmpeg child
                // and abandons in-flight store/storage I/O.
                let err = WorkerError::DeadlineExceeded(deadline.as_secs());
                fail_job(self.ctx.as_ref(), msg, &err).await;
            }
        }
    }
}
