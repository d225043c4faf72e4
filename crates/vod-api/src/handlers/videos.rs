//! Video API handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vod_models::utils::safe_filename;
use vod_models::{Video, VideoId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upload presign request.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignUploadRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub filename: String,
    pub thumbnail_filename: String,
    #[serde(default)]
    pub video_type: Option<String>,
    #[serde(default)]
    pub thumb_type: Option<String>,
}

/// Upload presign response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignUploadResponse {
    pub video_id: String,
    pub video_upload_url: String,
    pub thumbnail_upload_url: String,
    pub input_key: String,
    pub thumbnail_key: String,
}

/// Register a video and presign its upload URLs.
///
/// The row is written before the client uploads a single byte; its
/// status stays `uploaded` until a job is submitted against it.
pub async fn presign_upload(
    State(state): State<AppState>,
    Json(req): Json<PresignUploadRequest>,
) -> ApiResult<(StatusCode, Json<PresignUploadResponse>)> {
    if req.filename.trim().is_empty() {
        return Err(ApiError::validation("filename is required"));
    }
    if req.thumbnail_filename.trim().is_empty() {
        return Err(ApiError::validation("thumbnailFilename is required"));
    }

    let video_id = VideoId::new();
    let content_type = req
        .video_type
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "video/mp4".to_string());
    let thumb_type = req
        .thumb_type
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "image/jpeg".to_string());

    let base = &state.config.key_base;
    let input_key = format!("{base}inputs/{video_id}-{}", safe_filename(&req.filename));
    let thumbnail_key = format!(
        "{base}thumbnails/{video_id}-{}",
        safe_filename(&req.thumbnail_filename)
    );

    let video_upload_url = state
        .storage
        .presign_put(&input_key, &content_type, state.config.presign_put_ttl)
        .await?;
    let thumbnail_upload_url = state
        .storage
        .presign_put(&thumbnail_key, &thumb_type, state.config.presign_put_ttl)
        .await?;

    let video = Video::new(
        video_id.clone(),
        req.title,
        req.description,
        req.filename,
        content_type,
        &input_key,
        &thumbnail_key,
    );
    state.store.videos.create(&video).await?;

    info!(video_id = %video_id, input_key = %input_key, "Registered video for upload");

    Ok((
        StatusCode::CREATED,
        Json(PresignUploadResponse {
            video_id: video_id.to_string(),
            video_upload_url,
            thumbnail_upload_url,
            input_key,
            thumbnail_key,
        }),
    ))
}

/// Video detail response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub filename: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl VideoResponse {
    fn from_video(video: Video, thumbnail_url: Option<String>) -> Self {
        Self {
            id: video.id.to_string(),
            title: video.title,
            description: video.description,
            filename: video.filename,
            status: video.status.to_string(),
            latest_job_id: video.latest_job_id.map(|j| j.to_string()),
            error_msg: video.error_msg,
            thumbnail_url,
            created_at: video.created_at.to_rfc3339(),
            updated_at: video.updated_at.to_rfc3339(),
        }
    }
}

/// Presign a video's thumbnail for a response. The URL is a
/// convenience; a presign failure must not turn a perfectly good read
/// into a 500.
async fn presign_thumbnail(state: &AppState, video: &Video) -> Option<String> {
    match state
        .storage
        .presign_get(&video.thumbnail_key, state.config.presign_get_ttl)
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(video_id = %video.id, error = %e, "Failed to presign thumbnail");
            None
        }
    }
}

/// Get a video by id.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let video = state
        .store
        .videos
        .get(&VideoId::from_string(&video_id))
        .await?;

    let thumbnail_url = presign_thumbnail(&state, &video).await;
    Ok(Json(VideoResponse::from_video(video, thumbnail_url)))
}

/// List videos query params.
#[derive(Deserialize)]
pub struct ListVideosQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Video list response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosResponse {
    pub videos: Vec<VideoResponse>,
    pub total: i64,
}

/// List videos, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<ListVideosQuery>,
) -> ApiResult<Json<ListVideosResponse>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let (videos, total) = state.store.videos.list(limit, offset).await?;

    // Each grid item carries its own presigned thumbnail, same
    // best-effort rules as the single-video read.
    let mut items = Vec::with_capacity(videos.len());
    for video in videos {
        let thumbnail_url = presign_thumbnail(&state, &video).await;
        items.push(VideoResponse::from_video(video, thumbnail_url));
    }

    Ok(Json(ListVideosResponse {
        videos: items,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> Video {
        Video::new(
            VideoId::from_string("v1"),
            "Title",
            "",
            "a.mp4",
            "video/mp4",
            "inputs/v1-a.mp4",
            "thumbnails/v1-a.jpg",
        )
    }

    #[test]
    fn list_items_carry_their_thumbnail_url() {
        let item = VideoResponse::from_video(video(), Some("https://signed/thumb".to_string()));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["thumbnailUrl"], "https://signed/thumb");

        // A failed presign omits the field instead of sending null.
        let item = VideoResponse::from_video(video(), None);
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("thumbnailUrl").is_none());
    }
}
