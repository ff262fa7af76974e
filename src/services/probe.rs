//! Codec probing through `ffprobe`.
//!
//! The upload gate only needs the codec name of the first video stream, so
//! the trait stays that narrow. Tests substitute their own implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::{io, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not run ffprobe: {0}")]
    Spawn(#[source] io::Error),

    #[error("ffprobe failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    Parse(String),

    #[error("no video stream found")]
    NoVideoStream,

    #[error("probe did not finish within {0:?}")]
    TimedOut(std::time::Duration),
}

/// Inspects a media file and reports the codec of its first video stream.
#[async_trait]
pub trait CodecProbe: Send + Sync {
    async fn video_codec(&self, path: &Path) -> Result<String, ProbeError>;
}

/// Subset of `ffprobe -of json -show_entries stream=...` output.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_name: Option<String>,
    codec_type: Option<String>,
}

/// Runs the `ffprobe` binary as a child process.
///
/// The child is killed if the probing future is dropped, so a caller-side
/// timeout never leaves a process behind.
#[derive(Clone, Debug)]
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl CodecProbe for FfprobeProbe {
    async fn video_codec(&self, path: &Path) -> Result<String, ProbeError> {
        let output = tokio::process::Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_name,codec_type",
                "-of",
                "json",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ProbeError::Spawn)?;

        if !output.status.success() {
            return Err(ProbeError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_video_codec(&output.stdout)
    }
}

fn parse_video_codec(stdout: &[u8]) -> Result<String, ProbeError> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout).map_err(|e| {
        ProbeError::Parse(format!("{}: {}", e, String::from_utf8_lossy(stdout)))
    })?;

    parsed
        .streams
        .into_iter()
        .filter(|s| s.codec_type.as_deref().is_none_or(|t| t == "video"))
        .find_map(|s| s.codec_name)
        .ok_or(ProbeError::NoVideoStream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_video_stream_codec() {
        let out = br#"{"programs":[],"streams":[{"codec_name":"vp9","codec_type":"video"}]}"#;
        assert_eq!(parse_video_codec(out).unwrap(), "vp9");
    }

    #[test]
    fn skips_non_video_streams() {
        let out = br#"{"streams":[{"codec_name":"aac","codec_type":"audio"},{"codec_name":"h264","codec_type":"video"}]}"#;
        assert_eq!(parse_video_codec(out).unwrap(), "h264");
    }

    #[test]
    fn empty_stream_list_is_an_error() {
        assert!(matches!(
            parse_video_codec(br#"{}"#),
            Err(ProbeError::NoVideoStream)
        ));
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        assert!(matches!(
            parse_video_codec(b"not json"),
            Err(ProbeError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let probe = FfprobeProbe::new("/nonexistent/ffprobe-binary");
        let err = probe
            .video_codec(Path::new("/tmp/whatever.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::Spawn(_)));
    }
}
