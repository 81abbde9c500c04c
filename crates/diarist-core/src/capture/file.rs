use std::collections::VecDeque;
use std::path::PathBuf;

use tokio::sync::Mutex;

use super::{mime_for_path, ActiveCapture, AudioSource, CaptureError, CaptureResult};

/// Replays audio files from disk, one file per recording.
pub struct FileAudioSource {
    queue: Mutex<VecDeque<PathBuf>>,
    fallback_mime: String,
}

impl FileAudioSource {
    pub fn new(files: Vec<PathBuf>, fallback_mime: String) -> Self {
        Self {
            queue: Mutex::new(files.into()),
            fallback_mime,
        }
    }

    pub async fn remaining(&self) -> usize {
        self.queue.lock().await.len()
    }
}

impl AudioSource for FileAudioSource {
    async fn start(&self) -> CaptureResult<ActiveCapture> {
        let path = self
            .queue
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| CaptureError::Unsupported("no more audio files queued".into()))?;

        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                CaptureError::PermissionDenied(format!("{}: {e}", path.display()))
            }
            _ => CaptureError::Device(format!("{}: {e}", path.display())),
        })?;

        let mime = mime_for_path(&path)
            .unwrap_or(&self.fallback_mime)
            .to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "replaying audio file");
        Ok(ActiveCapture::buffered(vec![bytes], mime, file_name))
    }

    fn describe(&self) -> String {
        "audio files".to_string()
    }
}
