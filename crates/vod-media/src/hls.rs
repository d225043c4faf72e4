//! HLS ladder transcode via FFmpeg.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Name of the top-level playlist referencing all renditions.
pub const MASTER_MANIFEST: &str = "master.m3u8";

/// Segment duration in seconds.
const SEGMENT_SECONDS: u32 = 4;

/// Keyframe interval in frames, aligned to the segment duration at
/// 30 fps so renditions switch cleanly at segment boundaries.
const GOP_FRAMES: u32 = SEGMENT_SECONDS * 30;

/// One rung of the fixed bitrate ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendition {
    /// Rendition name as exposed to clients (e.g. "720p")
    pub name: &'static str,
    /// Maximum frame width
    pub width: u32,
    /// Maximum frame height
    pub height: u32,
    /// Target video bitrate
    pub bitrate: &'static str,
    /// Rate-control ceiling
    pub maxrate: &'static str,
    /// Rate-control buffer
    pub bufsize: &'static str,
}

/// The fixed ladder, lowest tier first. Encoder parameters are policy,
/// not user input.
pub const RENDITIONS: [Rendition; 3] = [
    Rendition {
        name: "480p",
        width: 854,
        height: 480,
        bitrate: "800k",
        maxrate: "900k",
        bufsize: "1200k",
    },
    Rendition {
        name: "720p",
        width: 1280,
        height: 720,
        bitrate: "2000k",
        maxrate: "2200k",
        bufsize: "3000k",
    },
    Rendition {
        name: "1080p",
        width: 1920,
        height: 1080,
        bitrate: "4500k",
        maxrate: "5000k",
        bufsize: "6500k",
    },
];

/// Ladder names in order, as stored on the job row.
pub fn rendition_names() -> Vec<String> {
    RENDITIONS.iter().map(|r| r.name.to_string()).collect()
}

/// Build the fixed FFmpeg argument template for one input file and one
/// output directory.
///
/// The input is split into one scaled stream per rendition (dimensions
/// rounded down to even values for yuv420p), encoded as H.264 high
/// profile with AAC stereo audio, and muxed as a VOD HLS tree: variant
/// playlists `%v.m3u8`, segments `%v_%03d.ts` and the master manifest.
pub fn build_hls_args(input: &Path, out_dir: &Path) -> Vec<String> {
    let mut filter = String::new();
    filter.push_str(&format!("[0:v]split={}", RENDITIONS.len()));
    for (i, _) in RENDITIONS.iter().enumerate() {
        filter.push_str(&format!("[v{i}]"));
    }
    for (i, r) in RENDITIONS.iter().enumerate() {
        filter.push_str(&format!(
            ";[v{i}]scale=w={}:h={}:force_original_aspect_ratio=decrease,\
             scale=trunc(iw/2)*2:trunc(ih/2)*2[v{i}out]",
            r.width, r.height
        ));
    }

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-filter_complex".into(),
        filter,
    ];

    // Map each scaled video stream plus optional audio
    for (i, _) in RENDITIONS.iter().enumerate() {
        args.push("-map".into());
        args.push(format!("[v{i}out]"));
        args.push("-map".into());
        args.push("0:a?".into());
    }

    // Per-rendition video encode settings
    for (i, r) in RENDITIONS.iter().enumerate() {
        args.extend([
            format!("-c:v:{i}"),
            "libx264".into(),
            format!("-profile:v:{i}"),
            "high".into(),
            format!("-b:v:{i}"),
            r.bitrate.into(),
            format!("-maxrate:v:{i}"),
            r.maxrate.into(),
            format!("-bufsize:v:{i}"),
            r.bufsize.into(),
        ]);
    }
    args.extend(["-pix_fmt".into(), "yuv420p".into()]);

    // Audio
    args.extend([
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "128k".into(),
        "-ac".into(),
        "2".into(),
    ]);

    // Keyframe alignment for clean rendition switches
    args.extend([
        "-g".into(),
        GOP_FRAMES.to_string(),
        "-keyint_min".into(),
        GOP_FRAMES.to_string(),
        "-sc_threshold".into(),
        "0".into(),
    ]);

    // HLS muxing
    let var_stream_map = RENDITIONS
        .iter()
        .enumerate()
        .map(|(i, _)| format!("v:{i},a:{i}"))
        .collect::<Vec<_>>()
        .join(" ");

    args.extend([
        "-f".into(),
        "hls".into(),
        "-hls_time".into(),
        SEGMENT_SECONDS.to_string(),
        "-hls_playlist_type".into(),
        "vod".into(),
        "-hls_flags".into(),
        "independent_segments".into(),
        "-hls_segment_filename".into(),
        out_dir.join("%v_%03d.ts").to_string_lossy().into_owned(),
        "-master_pl_name".into(),
        MASTER_MANIFEST.into(),
        "-var_stream_map".into(),
        var_stream_map,
        out_dir.join("%v.m3u8").to_string_lossy().into_owned(),
    ]);

    args
}

/// Run the HLS transcode, producing the full ladder under `out_dir`.
///
/// Captures combined stdout/stderr for error reporting. The child is
/// killed when the returned future is dropped, so a caller-imposed
/// deadline aborts the encode. Success requires both a zero exit code
/// and the master manifest actually existing on disk.
pub async fn run_hls_transcode(input: &Path, out_dir: &Path) -> MediaResult<()> {
    if !input.exists() {
        return Err(MediaError::InputNotFound(input.to_path_buf()));
    }
    let ffmpeg = which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    tokio::fs::create_dir_all(out_dir).await?;

    let args = build_hls_args(input, out_dir);
    debug!("Running ffmpeg {}", args.join(" "));

    let output = Command::new(ffmpeg)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        let mut diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if diagnostics.is_empty() {
            diagnostics = String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
        if diagnostics.is_empty() {
            diagnostics = "no ffmpeg output".to_string();
        }
        return Err(MediaError::FfmpegFailed {
            exit_code: output.status.code(),
            diagnostics: tail(&diagnostics, 4000),
        });
    }

    // A zero exit code is not enough; the master playlist must exist.
    let master = out_dir.join(MASTER_MANIFEST);
    if !master.exists() {
        return Err(MediaError::MasterManifestMissing(master));
    }

    info!("Transcoded {} into {}", input.display(), out_dir.display());
    Ok(())
}

/// Keep the last `max` bytes of tool output; the tail carries the
/// actual error.
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let start = s.len() - max;
    let start = s
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= start)
        .unwrap_or(0);
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn ladder_names_are_ordered_low_to_high() {
        assert_eq!(rendition_names(), vec!["480p", "720p", "1080p"]);
    }

    #[test]
    fn args_cover_every_rendition() {
        let args = build_hls_args(Path::new("/work/input.mp4"), Path::new("/work/hls"));

        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.contains("split=3"));
        assert!(filter.contains("w=854:h=480"));
        assert!(filter.contains("w=1280:h=720"));
        assert!(filter.contains("w=1920:h=1080"));

        for i in 0..3 {
            assert!(args.contains(&format!("-c:v:{i}")));
            assert!(args.contains(&format!("-b:v:{i}")));
        }
        assert!(args.contains(&"4500k".to_string()));
    }

    #[test]
    fn gop_is_aligned_to_segment_duration() {
        let args = build_hls_args(Path::new("in.mp4"), Path::new("out"));
        let g = &args[args.iter().position(|a| a == "-g").unwrap() + 1];
        let hls_time = &args[args.iter().position(|a| a == "-hls_time").unwrap() + 1];
        assert_eq!(g, "120");
        assert_eq!(hls_time, "4");
    }

    #[test]
    fn master_manifest_is_named_in_args() {
        let args = build_hls_args(Path::new("in.mp4"), Path::new("out"));
        let master = &args[args.iter().position(|a| a == "-master_pl_name").unwrap() + 1];
        assert_eq!(master, MASTER_MANIFEST);

        let var_map = &args[args.iter().position(|a| a == "-var_stream_map").unwrap() + 1];
        assert_eq!(var_map, "v:0,a:0 v:1,a:1 v:2,a:2");
    }

    #[tokio::test]
    async fn missing_input_is_rejected_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let missing = PathBuf::from(dir.path()).join("nope.mp4");
        let err = run_hls_transcode(&missing, dir.path()).await.unwrap_err();
        assert!(matches!(err, MediaError::InputNotFound(_)));
    }

    #[test]
    fn tail_keeps_the_end_of_long_output() {
        let s = "a".repeat(100) + "error: bad stream";
        let t = tail(&s, 20);
        assert!(t.ends_with("error: bad stream"));
        assert!(t.len() <= 20);
    }
}
