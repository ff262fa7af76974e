//! UploadGate: admits a video into the videos directory only if its declared
//! container and its probed codec are embeddable together.
//!
//! Bytes are staged in a hidden temp file next to their final location,
//! probed there, then renamed into place or removed.

use crate::services::{
    probe::{CodecProbe, ProbeError},
    session::Session,
};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt, time::timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Embeddable codecs per accepted container.
const CONTAINER_CODECS: [(&str, &[&str]); 2] = [
    ("video/mp4", &["h264", "av1"]),
    ("video/webm", &["vp8", "vp9", "av1"]),
];
const FALLBACK_NAME: &str = "video";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("couldn't upload video")]
    MissingFile,
    #[error("unsupported filetype '{0}', please choose .mp4 or .webm")]
    UnsupportedType(String),
    #[error(
        "unsupported video codec '{0}', please use h264 or av1 in .mp4, or vp8, vp9 or av1 in .webm"
    )]
    UnsupportedCodec(String),
    #[error("couldn't store video: {0}")]
    Io(#[from] io::Error),
}

/// A file field taken from the upload form.
#[derive(Debug, Clone)]
pub struct UploadedVideo {
    pub file_name: String,
    pub content_type: String,
    pub bytes: bytes::Bytes,
}

#[derive(Clone)]
pub struct UploadGate {
    videos_dir: PathBuf,
    probe: Arc<dyn CodecProbe>,
    probe_timeout: Duration,
}

impl UploadGate {
    pub fn new(
        videos_dir: impl Into<PathBuf>,
        probe: Arc<dyn CodecProbe>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            videos_dir: videos_dir.into(),
            probe,
            probe_timeout,
        }
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// Validate an upload and, on success, store it under a fresh unique name
    /// which is returned.
    pub async fn validate_upload(
        &self,
        bytes: &[u8],
        content_type: &str,
        original_name: &str,
    ) -> Result<String, UploadError> {
        let container = normalize_mime_type(content_type);
        let allowed = allowed_codecs(&container)
            .ok_or_else(|| UploadError::UnsupportedType(content_type.to_string()))?;
        if bytes.is_empty() {
            return Err(UploadError::MissingFile);
        }

        let tmp_path = self.videos_dir.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(err) = write_file(&tmp_path, bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(UploadError::Io(err));
        }

        let probed = timeout(self.probe_timeout, self.probe.video_codec(&tmp_path))
            .await
            .unwrap_or_else(|_| Err(ProbeError::TimedOut(self.probe_timeout)));
        let codec = match probed {
            Ok(codec) => codec,
            Err(err) => {
                warn!("codec probe failed for {}: {}", original_name, err);
                String::new()
            }
        };

        if !allowed.contains(&codec.as_str()) {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(UploadError::UnsupportedCodec(codec));
        }

        let stored_name = format!(
            "{}_{}",
            Uuid::new_v4().simple(),
            sanitize_file_name(original_name)
        );
        let final_path = self.videos_dir.join(&stored_name);
        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(UploadError::Io(err));
        }

        info!(
            "stored {} video {} as {} ({} bytes)",
            codec,
            original_name,
            stored_name,
            bytes.len()
        );
        Ok(stored_name)
    }

    /// Validate and store an upload, then make it the session's pending video.
    ///
    /// A previously pending video that never got attached is deleted.
    pub async fn accept(
        &self,
        upload: &UploadedVideo,
        session: &Session,
    ) -> Result<String, UploadError> {
        let stored_name = self
            .validate_upload(&upload.bytes, &upload.content_type, &upload.file_name)
            .await?;

        let previous = session.replace_pending_video(stored_name.clone()).await;
        if !previous.is_empty() {
            self.remove_video(&previous).await;
        }

        Ok(stored_name)
    }

    async fn remove_video(&self, name: &str) {
        if sanitize_file_name(name) != name {
            warn!("refusing to delete suspicious video name {:?}", name);
            return;
        }
        let path = self.videos_dir.join(name);
        match fs::remove_file(&path).await {
            Ok(_) => debug!("removed unattached video {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("unattached video {} already missing", path.display());
            }
            Err(err) => warn!("failed to remove unattached video {}: {}", path.display(), err),
        }
    }
}

fn allowed_codecs(container: &str) -> Option<&'static [&'static str]> {
    CONTAINER_CODECS
        .iter()
        .find(|(mime, _)| *mime == container)
        .map(|(_, codecs)| *codecs)
}

/// Strip MIME parameters and lowercase ("video/MP4; codecs=x" -> "video/mp4").
fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Keep the last path component of a client filename, limited to
/// `[A-Za-z0-9._-]`, never hidden.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
