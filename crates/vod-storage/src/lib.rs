//! S3-compatible object storage gateway.
//!
//! This crate provides:
//! - Presigned PUT/GET URL generation
//! - Streaming download to local files
//! - Single-file and recursive directory upload
//! - Per-extension content-type inference for HLS artifacts

pub mod client;
pub mod error;

pub use client::{ObjectStore, StorageConfig};
pub use error::{StorageError, StorageResult};

/// Infer the content type for an object key or local path by extension.
///
/// HLS manifests and transport-stream segments get their streaming
/// types; everything else falls back to a generic binary type.
pub fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("mp4") => "video/mp4",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_streaming_types() {
        assert_eq!(content_type_for("outputs/v/j/master.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(content_type_for("outputs/v/j/0_001.ts"), "video/mp2t");
    }

    #[test]
    fn falls_back_to_octet_stream() {
        assert_eq!(content_type_for("outputs/v/j/notes.txt"), "application/octet-stream");
        assert_eq!(content_type_for("no-extension"), "application/octet-stream");
    }
}
