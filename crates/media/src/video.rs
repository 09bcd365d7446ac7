//! Single-frame extraction from video containers via an external `ffmpeg`
//! binary.

use crate::MediaError;
use async_trait::async_trait;
use std::{path::Path, process::Stdio, time::Duration};
use tempfile::NamedTempFile;
use tokio::{process::Command, time::timeout};
use tracing::trace;

/// Capability that extracts one representative frame from a video file.
///
/// The returned [`NamedTempFile`] deletes itself on drop, so the frame never
/// outlives its consumer regardless of how processing ends.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
	async fn extract_frame(&self, source: &Path) -> Result<NamedTempFile, MediaError>;
}

/// [`FrameExtractor`] backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
	binary: String,
	timeout: Duration,
}

impl Default for FfmpegFrameExtractor {
	fn default() -> Self {
		Self {
			binary: "ffmpeg".to_owned(),
			timeout: Duration::from_secs(60),
		}
	}
}

impl FfmpegFrameExtractor {
	pub fn new(binary: impl Into<String>) -> Self {
		Self {
			binary: binary.into(),
			..Default::default()
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
	async fn extract_frame(&self, source: &Path) -> Result<NamedTempFile, MediaError> {
		let frame = tempfile::Builder::new()
			.prefix("ambry-frame-")
			.suffix(".png")
			.tempfile()?;

		trace!(source = %source.display(), frame = %frame.path().display(), "extracting video frame");

		let run = Command::new(&self.binary)
			.args(["-y", "-loglevel", "error", "-i"])
			.arg(source)
			.args(["-frames:v", "1", "-f", "image2"])
			.arg(frame.path())
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.kill_on_drop(true)
			.output();

		let output = timeout(self.timeout, run)
			.await
			.map_err(|_| MediaError::Timeout {
				tool: self.binary.clone(),
				timeout: self.timeout,
			})??;

		if !output.status.success() {
			return Err(MediaError::Tool {
				tool: self.binary.clone(),
				status: output.status,
				stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
			});
		}

		Ok(frame)
	}
}
