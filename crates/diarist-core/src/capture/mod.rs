//! Audio capture adapters.
//!
//! A recording segment is started with [`AudioSource::start`] and flushed with
//! [`ActiveCapture::stop`], which returns one [`AudioBlob`] and releases the
//! device. Sources are enum-dispatched through [`Capture`].

mod command;
mod file;
mod scripted;

pub use command::CommandAudioSource;
pub use file::FileAudioSource;
pub use scripted::ScriptedAudioSource;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::config::CaptureConfig;
use crate::error::{DiaristError, Result};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio capture is not supported: {0}")]
    Unsupported(String),

    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("recording produced no audio")]
    Empty,

    #[error("capture device failed: {0}")]
    Device(String),
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

/// One recorded segment, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

impl AudioBlob {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            file_name: file_name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read a blob from disk, guessing the MIME type from the extension.
    pub async fn from_path(path: &std::path::Path, fallback_mime: &str) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());
        let mime = mime_for_path(path).unwrap_or(fallback_mime).to_string();
        Ok(Self::new(bytes, mime, file_name))
    }
}

/// MIME type for common audio extensions.
pub fn mime_for_path(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "wav" => Some("audio/wav"),
        "webm" => Some("audio/webm"),
        "ogg" | "oga" => Some("audio/ogg"),
        "mp3" => Some("audio/mpeg"),
        "m4a" | "mp4" => Some("audio/mp4"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}

/// A device or file that can produce recording segments.
pub trait AudioSource: Send + Sync {
    /// Acquire the device and begin buffering audio.
    fn start(&self) -> impl std::future::Future<Output = CaptureResult<ActiveCapture>> + Send;

    /// Short label for status output.
    fn describe(&self) -> String;
}

/// A recording in progress. Dropping it without `stop` kills any recorder
/// process but yields no audio.
#[derive(Debug)]
pub struct ActiveCapture {
    inner: CaptureInner,
    mime: String,
    file_name: String,
}

#[derive(Debug)]
enum CaptureInner {
    Buffered(Vec<Vec<u8>>),
    Process {
        child: Child,
        reader: JoinHandle<std::io::Result<Vec<u8>>>,
    },
}

impl ActiveCapture {
    pub(crate) fn buffered(chunks: Vec<Vec<u8>>, mime: String, file_name: String) -> Self {
        Self {
            inner: CaptureInner::Buffered(chunks),
            mime,
            file_name,
        }
    }

    /// Wrap a spawned recorder, draining its stdout in the background.
    pub(crate) fn process(mut child: Child, mime: String, file_name: String) -> CaptureResult<Self> {
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Device("recorder stdout is not piped".into()))?;
        let reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await?;
            Ok(buf)
        });
        Ok(Self {
            inner: CaptureInner::Process { child, reader },
            mime,
            file_name,
        })
    }

    /// Stop recording, release the device, and flush everything into one blob.
    pub async fn stop(self) -> CaptureResult<AudioBlob> {
        let bytes = match self.inner {
            CaptureInner::Buffered(chunks) => chunks.concat(),
            CaptureInner::Process { mut child, reader } => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!("recorder already exited: {e}");
                }
                let _ = child.wait().await;
                reader
                    .await
                    .map_err(|e| CaptureError::Device(format!("reader task failed: {e}")))?
                    .map_err(|e| CaptureError::Device(format!("failed to read audio: {e}")))?
            }
        };

        if bytes.is_empty() {
            return Err(CaptureError::Empty);
        }
        tracing::debug!(bytes = bytes.len(), mime = %self.mime, "capture flushed");
        Ok(AudioBlob::new(bytes, self.mime, self.file_name))
    }
}

/// Enum wrapper for capture sources.
pub enum Capture {
    Command(CommandAudioSource),
    File(FileAudioSource),
    Scripted(ScriptedAudioSource),
    Disabled,
}

impl AudioSource for Capture {
    async fn start(&self) -> CaptureResult<ActiveCapture> {
        match self {
            Capture::Command(s) => s.start().await,
            Capture::File(s) => s.start().await,
            Capture::Scripted(s) => s.start().await,
            Capture::Disabled => Err(CaptureError::Unsupported(
                "audio capture is disabled in config".into(),
            )),
        }
    }

    fn describe(&self) -> String {
        match self {
            Capture::Command(s) => s.describe(),
            Capture::File(s) => s.describe(),
            Capture::Scripted(s) => s.describe(),
            Capture::Disabled => "disabled".to_string(),
        }
    }
}

/// Create a capture source from the given configuration.
pub fn create_source(config: &CaptureConfig) -> Result<Capture> {
    match config.source.as_str() {
        "command" => Ok(Capture::Command(CommandAudioSource::new(
            config.command.clone(),
            config.mime.clone(),
            config.file_name.clone(),
        ))),
        "file" => Ok(Capture::File(FileAudioSource::new(
            config.files.iter().map(std::path::PathBuf::from).collect(),
            config.mime.clone(),
        ))),
        "none" => Ok(Capture::Disabled),
        other => Err(DiaristError::Config(format!(
            "unknown capture source: {other}"
        ))),
    }
}
