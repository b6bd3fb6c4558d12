//! Resolution probing with ffprobe.

use std::path::Path;
use std::time::Duration;

use ripvault_common::paths::resolution_label;
use ripvault_common::{Error, Result};
use serde::Deserialize;

use crate::command::ToolCommand;

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    height: Option<u32>,
}

/// Height of the first video stream in ffprobe JSON output.
pub fn parse_video_height(json: &str) -> Result<u32> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| Error::parse(format!("ffprobe output: {e}")))?;

    output
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref().unwrap_or("video") == "video")
        .find_map(|s| s.height)
        .ok_or_else(|| Error::parse("ffprobe found no video stream"))
}

/// Probe the resolution label of a video file, e.g. `1080p` or `4k`.
pub async fn probe_resolution(ffprobe: &Path, file: &Path) -> Result<String> {
    let output = ToolCommand::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(file.to_string_lossy())
        .timeout(PROBE_TIMEOUT)
        .execute()
        .await?;

    parse_video_height(&output.stdout).map(resolution_label)
}
