//! Playback status handler.
//!
//! Clients poll this while a job runs. The response is assembled from
//! the video row plus its latest job; a video with no job yet still
//! answers, with zero progress and no manifest.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use vod_models::{Job, VideoId};

use crate::error::ApiResult;
use crate::state::AppState;

/// Playback status response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackResponse {
    pub video_id: String,
    pub status: String,
    pub progress: u8,
    pub playback_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_url: Option<String>,
    pub available_renditions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

/// The master manifest is only presigned once the job says it is
/// servable; a key written without the ready flag stays private.
fn presignable_master(job: &Job) -> Option<&str> {
    if !job.playback_ready {
        return None;
    }
    job.output_master_key
        .as_deref()
        .filter(|key| !key.is_empty())
}

/// Get playback status for a video.
pub async fn get_playback(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<PlaybackResponse>> {
    let video_id = VideoId::from_string(&video_id);
    let video = state.store.videos.get(&video_id).await?;

    let job = match &video.latest_job_id {
        Some(job_id) => Some(state.store.jobs.get(job_id).await?),
        None => None,
    };

    let Some(job) = job else {
        return Ok(Json(PlaybackResponse {
            video_id: video.id.to_string(),
            status: video.status.to_string(),
            progress: 0,
            playback_ready: false,
            master_key: None,
            master_url: None,
            available_renditions: Vec::new(),
            job_id: None,
            error_msg: video.error_msg,
        }));
    };

    let master_url = match presignable_master(&job) {
        Some(key) => Some(
            state
                .storage
                .presign_get(key, state.config.presign_get_ttl)
                .await?,
        ),
        None => None,
    };

    // Once a job exists its status is the authoritative one for
    // playback polling; the video status lags behind terminal writes.
    Ok(Json(PlaybackResponse {
        video_id: video.id.to_string(),
        status: job.status.to_string(),
        progress: job.progress,
        playback_ready: job.playback_ready,
        master_key: job.output_master_key.clone(),
        master_url,
        available_renditions: job.available_renditions,
        job_id: Some(job.id.to_string()),
        error_msg: job.error_msg,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_is_presignable_only_when_ready() {
        let mut job = Job::new(VideoId::new(), "inputs/a.mp4", None);
        assert_eq!(presignable_master(&job), None);

        job.output_master_key = Some("outputs/v/j/master.m3u8".to_string());
        assert_eq!(presignable_master(&job), None);

        job.playback_ready = true;
        assert_eq!(presignable_master(&job), Some("outputs/v/j/master.m3u8"));

        job.output_master_key = Some(String::new());
        assert_eq!(presignable_master(&job), None);
    }
}
