//! Video repository.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use vod_models::{JobId, Video, VideoId, VideoStatus};

use crate::error::{StoreError, StoreResult};

const VIDEO_COLUMNS: &str = "id, title, description, filename, content_type, input_key, \
     thumbnail_key, latest_job_id, status, error_msg, created_at, updated_at";

/// Repository for the `videos` table.
#[derive(Clone)]
pub struct VideoStore {
    pool: PgPool,
}

impl VideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new video row.
    pub async fn create(&self, video: &Video) -> StoreResult<()> {
        debug!(video_id = %video.id, "Creating video row");

        sqlx::query(
            r#"
            INSERT INTO videos
                (id, title, description, filename, content_type, input_key,
                 thumbnail_key, latest_job_id, status, error_msg, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(video.id.as_str())
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.filename)
        .bind(&video.content_type)
        .bind(&video.input_key)
        .bind(&video.thumbnail_key)
        .bind(video.latest_job_id.as_ref().map(|j| j.as_str()))
        .bind(video.status.as_str())
        .bind(video.error_msg.as_deref())
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a video by id.
    pub async fn get(&self, id: &VideoId) -> StoreResult<Video> {
        let row = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => video_from_row(&row),
            None => Err(StoreError::not_found(format!("video {id}"))),
        }
    }

    /// List videos, newest first, with the total count.
    pub async fn list(&self, limit: i64, offset: i64) -> StoreResult<(Vec<Video>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let videos = rows
            .iter()
            .map(video_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((videos, total))
    }

    /// Point the video at its most recently created job.
    pub async fn set_latest_job(&self, video_id: &VideoId, job_id: &JobId) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE videos SET latest_job_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(video_id.as_str())
        .bind(job_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("video {video_id}")));
        }
        Ok(())
    }

    /// Mark the video processing. Videos already `ready` or `failed` stay
    /// untouched until a terminal write for the new job lands.
    pub async fn mark_processing(&self, id: &VideoId) -> StoreResult<()> {
        self.set_status(id, VideoStatus::Processing, None).await
    }

    /// Mark the video ready, clearing any stale error message.
    pub async fn mark_ready(&self, id: &VideoId) -> StoreResult<()> {
        self.set_status(id, VideoStatus::Ready, None).await
    }

    /// Mark the video failed with the triggering error.
    pub async fn mark_failed(&self, id: &VideoId, msg: &str) -> StoreResult<()> {
        self.set_status(id, VideoStatus::Failed, Some(msg)).await
    }

    async fn set_status(
        &self,
        id: &VideoId,
        status: VideoStatus,
        error_msg: Option<&str>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE videos SET status = $2, error_msg = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(status.as_str())
        .bind(error_msg)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("video {id}")));
        }
        Ok(())
    }
}

fn video_from_row(row: &PgRow) -> StoreResult<Video> {
    let status: String = row.get("status");
    let status = VideoStatus::parse(&status)
        .ok_or_else(|| StoreError::corrupt_row(format!("unknown video status {status:?}")))?;

    Ok(Video {
        id: VideoId::from_string(row.get::<String, _>("id")),
        title: row.get("title"),
        description: row.get("description"),
        filename: row.get("filename"),
        content_type: row.get("content_type"),
        input_key: row.get("input_key"),
        thumbnail_key: row.get("thumbnail_key"),
        latest_job_id: row
            .get::<Option<String>, _>("latest_job_id")
            .map(JobId::from_string),
        status,
        error_msg: row.get("error_msg"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
