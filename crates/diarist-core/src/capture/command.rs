use std::process::Stdio;

use tokio::process::Command;

use super::{ActiveCapture, AudioSource, CaptureError, CaptureResult};

/// Records by spawning an external recorder that writes audio to stdout.
#[derive(Debug, Clone)]
pub struct CommandAudioSource {
    argv: Vec<String>,
    mime: String,
    file_name: String,
}

impl CommandAudioSource {
    pub fn new(argv: Vec<String>, mime: String, file_name: String) -> Self {
        Self {
            argv,
            mime,
            file_name,
        }
    }

    /// Whether the recorder binary can be found on PATH.
    pub fn is_available(&self) -> bool {
        self.argv
            .first()
            .is_some_and(|program| which::which(program).is_ok())
    }
}

impl AudioSource for CommandAudioSource {
    async fn start(&self) -> CaptureResult<ActiveCapture> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(CaptureError::Unsupported("no recorder command configured".into()));
        };
        let path = which::which(program)
            .map_err(|_| CaptureError::Unsupported(format!("recorder '{program}' not found")))?;

        let child = Command::new(&path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    CaptureError::PermissionDenied(format!("{program}: {e}"))
                }
                _ => CaptureError::Device(format!("{program}: {e}")),
            })?;

        tracing::info!(recorder = %program, "recording started");
        ActiveCapture::process(child, self.mime.clone(), self.file_name.clone())
    }

    fn describe(&self) -> String {
        self.argv.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(argv: &[&str]) -> CommandAudioSource {
        CommandAudioSource::new(
            argv.iter().map(|s| s.to_string()).collect(),
            "audio/wav".into(),
            "recording.wav".into(),
        )
    }

    #[tokio::test]
    async fn test_missing_recorder_is_unsupported() {
        let s = source(&["diarist-no-such-recorder-binary"]);
        assert!(!s.is_available());
        assert!(matches!(s.start().await, Err(CaptureError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_empty_argv_is_unsupported() {
        let s = source(&[]);
        assert!(matches!(s.start().await, Err(CaptureError::Unsupported(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_becomes_blob() {
        let s = source(&["sh", "-c", "printf RIFFdata; exec sleep 5"]);
        let capture = s.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let blob = capture.stop().await.unwrap();
        assert_eq!(blob.bytes, b"RIFFdata");
        assert_eq!(blob.mime, "audio/wav");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_command_is_empty() {
        let s = source(&["sh", "-c", "exec sleep 5"]);
        let capture = s.start().await.unwrap();
        assert!(matches!(capture.stop().await, Err(CaptureError::Empty)));
    }
}
