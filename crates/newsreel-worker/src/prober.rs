//! Video metadata extraction via ffprobe.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use newsreel_core::models::VideoMetadata;

/// Extracts duration and dimensions from a video file. Behind a trait so the
/// transcoding sweep can be exercised without ffmpeg installed.
#[async_trait]
pub trait VideoProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata>;
}

/// Shells out to ffprobe and parses its JSON output.
pub struct FfprobeProber {
    ffprobe_path: String,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[async_trait]
impl VideoProber for FfprobeProber {
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        let output = Command::new(&self.ffprobe_path)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.ffprobe_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "ffprobe exited with {} for {}: {}",
                output.status,
                path.display(),
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ffprobe_output(&stdout)
            .with_context(|| format!("Unparseable ffprobe output for {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    // ffprobe emits duration as a decimal string.
    duration: Option<String>,
}

fn parse_ffprobe_output(json: &str) -> Result<VideoMetadata> {
    let parsed: FfprobeOutput = serde_json::from_str(json).context("Invalid ffprobe JSON")?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .context("No video stream found")?;

    let width = stream.width.context("Video stream missing width")?;
    let height = stream.height.context("Video stream missing height")?;

    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .context("Format section missing duration")?
        .parse::<f64>()
        .context("Duration is not a number")?;

    Ok(VideoMetadata {
        duration,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "audio", "codec_name": "aac"},
            {"index": 1, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080}
        ],
        "format": {"filename": "clip.mp4", "duration": "12.480000", "size": "1048576"}
    }"#;

    #[test]
    fn parses_duration_and_dimensions() {
        let meta = parse_ffprobe_output(SAMPLE).unwrap();
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert!((meta.duration - 12.48).abs() < 1e-9);
    }

    #[test]
    fn audio_only_file_is_rejected() {
        let json = r#"{
            "streams": [{"codec_type": "audio"}],
            "format": {"duration": "3.0"}
        }"#;
        let err = parse_ffprobe_output(json).unwrap_err();
        assert!(err.to_string().contains("No video stream"));
    }

    #[test]
    fn missing_duration_is_rejected() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 480}],
            "format": {}
        }"#;
        assert!(parse_ffprobe_output(json).is_err());
    }

    #[test]
    fn garbage_output_is_rejected() {
        assert!(parse_ffprobe_output("not json at all").is_err());
    }
}
