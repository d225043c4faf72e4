//! Job submission handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use vod_models::VideoId;

use crate::error::ApiResult;
use crate::state::AppState;

/// Job submission request. The body may be omitted entirely.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub pipeline: Option<String>,
}

/// Job submission response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub video_id: String,
    pub status: String,
}

/// Submit a transcode job for a video.
pub async fn submit_job(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    body: Option<Json<SubmitJobRequest>>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let Json(req) = body.unwrap_or_default();

    let receipt = state
        .dispatch
        .submit(&VideoId::from_string(&video_id), req.pipeline)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitJobResponse {
            job_id: receipt.job_id.to_string(),
            video_id: receipt.video_id.to_string(),
            status: receipt.status.to_string(),
        }),
    ))
}
