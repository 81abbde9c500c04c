use std::collections::VecDeque;

use tokio::sync::Mutex;

use super::{ActiveCapture, AudioBlob, AudioSource, CaptureError, CaptureResult};

/// In-memory source that hands out prepared blobs.
pub struct ScriptedAudioSource {
    blobs: Mutex<VecDeque<AudioBlob>>,
    deny: bool,
}

impl ScriptedAudioSource {
    pub fn new(blobs: Vec<AudioBlob>) -> Self {
        Self {
            blobs: Mutex::new(blobs.into()),
            deny: false,
        }
    }

    /// A source whose every start is refused, like a blocked microphone.
    pub fn denied() -> Self {
        Self {
            blobs: Mutex::new(VecDeque::new()),
            deny: true,
        }
    }
}

impl AudioSource for ScriptedAudioSource {
    async fn start(&self) -> CaptureResult<ActiveCapture> {
        if self.deny {
            return Err(CaptureError::PermissionDenied("access refused".into()));
        }
        let blob = self
            .blobs
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| CaptureError::Unsupported("no scripted audio left".into()))?;
        Ok(ActiveCapture::buffered(
            vec![blob.bytes],
            blob.mime,
            blob.file_name,
        ))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
