//! Evidence (still image) capture
//!
//! The camera itself is an external collaborator: all the pipeline needs
//! is "produce a single JPEG or fail". Capture is best-effort — a failure
//! yields `None`, never an aborted session — and images are never cached
//! across captures.

use async_trait::async_trait;

use crate::Result;

/// Capability that yields zero-or-one still image per call
#[async_trait]
pub trait EvidenceSource: Send {
    /// Attempt one capture; `None` means no image could be produced
    async fn capture(&mut self) -> Result<Option<Vec<u8>>>;

    /// Whether a capture device is configured at all
    fn available(&self) -> bool {
        true
    }
}

/// Evidence source for hosts without a camera
pub struct NullEvidence;

#[async_trait]
impl EvidenceSource for NullEvidence {
    async fn capture(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn available(&self) -> bool {
        false
    }
}

/// Evidence source that shells out to an external capture command
///
/// The command receives the output JPEG path as its final argument and is
/// expected to exit zero with the file written (e.g.
/// `fswebcam --no-banner <path>`). The output file is scoped to the call.
pub struct CameraCommand {
    program: String,
    args: Vec<String>,
}

impl CameraCommand {
    /// Parse a capture command line into program and arguments
    ///
    /// Returns `None` for an empty command line.
    #[must_use]
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(ToString::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl EvidenceSource for CameraCommand {
    async fn capture(&mut self) -> Result<Option<Vec<u8>>> {
        let output = tempfile::Builder::new().suffix(".jpg").tempfile()?;
        let path = output.path().to_path_buf();

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => match tokio::fs::read(&path).await {
                Ok(bytes) if !bytes.is_empty() => {
                    tracing::debug!(bytes = bytes.len(), "captured evidence image");
                    Ok(Some(bytes))
                }
                Ok(_) => {
                    tracing::warn!("capture command wrote an empty image");
                    Ok(None)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read captured image");
                    Ok(None)
                }
            },
            Ok(status) => {
                tracing::warn!(%status, program = %self.program, "capture command failed");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, program = %self.program, "capture command did not run");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_program_and_args() {
        let cam = CameraCommand::parse("fswebcam --no-banner -r 640x480").unwrap();
        assert_eq!(cam.program, "fswebcam");
        assert_eq!(cam.args, ["--no-banner", "-r", "640x480"]);
    }

    #[test]
    fn parse_rejects_empty_command() {
        assert!(CameraCommand::parse("").is_none());
        assert!(CameraCommand::parse("   ").is_none());
    }

    #[tokio::test]
    async fn null_source_yields_nothing() {
        let mut source = NullEvidence;
        assert!(!source.available());
        assert!(source.capture().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_command_yields_none_not_error() {
        let mut cam = CameraCommand::parse("false").unwrap();
        assert_eq!(cam.capture().await.unwrap(), None);
    }
}
