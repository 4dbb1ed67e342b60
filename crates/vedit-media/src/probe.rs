//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::{check_ffprobe, diagnostic_tail, DIAGNOSTIC_TAIL_BYTES};
use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Frame count, when the container reports one
    pub frame_count: Option<u64>,
    /// Video codec
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Get the container duration of a media file in seconds.
pub async fn duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::probe(
            path,
            format!(
                "ffprobe exited with {:?}: {}",
                output.status.code(),
                diagnostic_tail(&stderr, DIAGNOSTIC_TAIL_BYTES)
            ),
        ));
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| MediaError::probe(path, "ffprobe did not report a duration"))
}

/// Probe a video file for stream information.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe(
            path,
            format!("ffprobe exited with {:?}", output.status.code()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    video_info_from(probe).ok_or_else(|| MediaError::probe(path, "no video stream found"))
}

fn video_info_from(probe: FfprobeOutput) -> Option<VideoInfo> {
    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video")?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(parse_duration)
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(30.0);

    let frame_count = video_stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok());

    Some(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        frame_count,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Parse a non-negative duration in seconds.
fn parse_duration(s: &str) -> Option<f64> {
    let value: f64 = s.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|fps: &f64| *fps > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("12.500000\n"), Some(12.5));
        assert_eq!(parse_duration("0"), Some(0.0));
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration("-1.0"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_video_info_from_json() {
        let probe: FfprobeOutput = serde_json::from_str(
            r#"{
                "format": {"duration": "42.5"},
                "streams": [
                    {"codec_type": "audio", "codec_name": "aac"},
                    {"codec_type": "video", "codec_name": "h264", "width": 1920,
                     "height": 1080, "avg_frame_rate": "30000/1001", "nb_frames": "1274"}
                ]
            }"#,
        )
        .unwrap();

        let info = video_info_from(probe).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.codec, "h264");
        assert_eq!(info.frame_count, Some(1274));
        assert!((info.duration - 42.5).abs() < 1e-9);
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_audio_only_has_no_video_info() {
        let probe: FfprobeOutput = serde_json::from_str(
            r#"{"format": {"duration": "3.0"}, "streams": [{"codec_type": "audio"}]}"#,
        )
        .unwrap();
        assert!(video_info_from(probe).is_none());
    }
}
