//! Job repository.
//!
//! Every write is an update keyed by job id, never an append, so
//! reprocessing a re-delivered message converges to the same terminal
//! state. The progress and output columns additionally enforce the job
//! invariants in SQL: progress never decreases, the master key and
//! playback flag move absent→present and false→true only.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use vod_models::job::clamp_progress;
use vod_models::{Job, JobId, JobStatus, VideoId};

use crate::error::{StoreError, StoreResult};

const JOB_COLUMNS: &str = "id, video_id, input_key, pipeline, status, error_msg, \
     output_master_key, playback_ready, available_renditions, progress, created_at, updated_at";

/// Repository for the `jobs` table.
#[derive(Clone)]
pub struct JobStore {
    pool: PgPool,
}

impl JobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new job row.
    pub async fn create(&self, job: &Job) -> StoreResult<()> {
        debug!(job_id = %job.id, video_id = %job.video_id, "Creating job row");

        let renditions = serde_json::to_value(&job.available_renditions)?;

        sqlx::query(
            r#"
            INSERT INTO jobs
                (id, video_id, input_key, pipeline, status, error_msg,
                 output_master_key, playback_ready, available_renditions, progress,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id.as_str())
        .bind(job.video_id.as_str())
        .bind(&job.input_key)
        .bind(&job.pipeline)
        .bind(job.status.as_str())
        .bind(job.error_msg.as_deref())
        .bind(job.output_master_key.as_deref())
        .bind(job.playback_ready)
        .bind(renditions)
        .bind(i32::from(job.progress))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a job by id.
    pub async fn get(&self, id: &JobId) -> StoreResult<Job> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => job_from_row(&row),
            None => Err(StoreError::not_found(format!("job {id}"))),
        }
    }

    /// Mark the job processing. A completed job is left untouched so
    /// re-delivered messages can never revert terminal state.
    pub async fn mark_processing(&self, id: &JobId) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'processing', updated_at = now()
            WHERE id = $1 AND status <> 'completed'
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        // Zero rows here means either a missing job or a completed one;
        // both are fine for a best-effort bookkeeping write.
        let _ = result.rows_affected();
        Ok(())
    }

    /// Mark the job failed with the triggering error.
    pub async fn mark_failed(&self, id: &JobId, msg: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', error_msg = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(msg)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("job {id}")));
        }
        Ok(())
    }

    /// Mark the job completed, forcing progress to 100 and clearing any
    /// error message. Output fields are left as written by
    /// [`update_progress`](Self::update_progress).
    pub async fn mark_completed(&self, id: &JobId) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed', progress = 100, error_msg = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("job {id}")));
        }
        Ok(())
    }

    /// Record a progress checkpoint.
    ///
    /// Monotonicity is enforced here rather than trusted from callers:
    /// progress takes the greatest value seen, the master key is only
    /// ever set (never cleared) and `playback_ready` only moves
    /// false→true.
    pub async fn update_progress(
        &self,
        id: &JobId,
        progress: i32,
        renditions: &[String],
        master_key: Option<&str>,
        playback_ready: bool,
    ) -> StoreResult<()> {
        let progress = clamp_progress(progress);
        let renditions = serde_json::to_value(renditions)?;

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET progress = GREATEST(progress, $2),
                available_renditions = $3,
                output_master_key = COALESCE($4, output_master_key),
                playback_ready = playback_ready OR $5,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(i32::from(progress))
        .bind(renditions)
        .bind(master_key)
        .bind(playback_ready)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("job {id}")));
        }
        Ok(())
    }
}

fn job_from_row(row: &PgRow) -> StoreResult<Job> {
    let status: String = row.get("status");
    let status = JobStatus::parse(&status)
        .ok_or_else(|| StoreError::corrupt_row(format!("unknown job status {status:?}")))?;

    let renditions: serde_json::Value = row.get("available_renditions");
    let available_renditions: Vec<String> = serde_json::from_value(renditions)?;

    Ok(Job {
        id: JobId::from_string(row.get::<String, _>("id")),
        video_id: VideoId::from_string(row.get::<String, _>("video_id")),
        input_key: row.get("input_key"),
        pipeline: row.get("pipeline"),
        status,
        error_msg: row.get("error_msg"),
        output_master_key: row.get("output_master_key"),
        playback_ready: row.get("playback_ready"),
        available_renditions,
        progress: clamp_progress(row.get::<i32, _>("progress")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
