//! The transcode work message.

use serde::{Deserialize, Serialize};

use vod_models::{JobId, VideoId};

/// Work message published per job submission.
///
/// Flat and self-contained: a consumer needs no other context to run
/// the pipeline. The stream entry is keyed by `job_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeJobMessage {
    /// Job to process
    pub job_id: JobId,
    /// Owning video
    pub video_id: VideoId,
    /// Source object key, frozen at job creation
    pub input_key: String,
    /// Pipeline name
    pub pipeline: String,
}

impl TranscodeJobMessage {
    /// Check the fields a consumer cannot work without. Messages failing
    /// this are dropped and logged, never retried.
    pub fn validate(&self) -> Result<(), String> {
        if self.job_id.as_str().trim().is_empty() {
            return Err("jobId is blank".to_string());
        }
        if self.video_id.as_str().trim().is_empty() {
            return Err("videoId is blank".to_string());
        }
        if self.input_key.trim().is_empty() {
            return Err("inputKey is blank".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> TranscodeJobMessage {
        TranscodeJobMessage {
            job_id: JobId::from_string("job-1"),
            video_id: VideoId::from_string("video-1"),
            input_key: "inputs/a.mp4".to_string(),
            pipeline: "hls".to_string(),
        }
    }

    #[test]
    fn wire_fields_are_camel_case() {
        let json = serde_json::to_value(message()).unwrap();
        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["videoId"], "video-1");
        assert_eq!(json["inputKey"], "inputs/a.mp4");
        assert_eq!(json["pipeline"], "hls");
    }

    #[test]
    fn missing_input_key_fails_to_deserialize() {
        let raw = r#"{"jobId":"job-1","videoId":"video-1","pipeline":"hls"}"#;
        assert!(serde_json::from_str::<TranscodeJobMessage>(raw).is_err());
    }

    #[test]
    fn blank_fields_fail_validation() {
        let mut msg = message();
        assert!(msg.validate().is_ok());

        msg.input_key = "  ".to_string();
        assert!(msg.validate().is_err());

        let mut msg = message();
        msg.job_id = JobId::from_string("");
        assert!(msg.validate().is_err());
    }
}
