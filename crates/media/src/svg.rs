//! Vector image rasterization through an external tool under a hard
//! wall-clock timeout.
//!
//! Rasterizers are the most hang-prone decoders the pipeline invokes, so
//! the child is killed the moment its budget elapses and the temp output is
//! removed on every exit path.

use crate::MediaError;
use async_trait::async_trait;
use std::{path::Path, process::Stdio, time::Duration};
use tempfile::NamedTempFile;
use tokio::{process::Command, time::timeout};
use tracing::trace;

/// Capability that converts one vector image into a raster temp file.
#[async_trait]
pub trait VectorRasterizer: Send + Sync {
	async fn rasterize(&self, source: &Path) -> Result<NamedTempFile, MediaError>;
}

/// [`VectorRasterizer`] that shells out to a converter with the
/// `rsvg-convert`-style calling convention: `<program> <source> -o <dest>`.
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
	program: String,
	timeout: Duration,
}

impl Default for CommandRasterizer {
	fn default() -> Self {
		Self {
			program: "rsvg-convert".to_owned(),
			timeout: Duration::from_secs(15),
		}
	}
}

impl CommandRasterizer {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
			..Default::default()
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

#[async_trait]
impl VectorRasterizer for CommandRasterizer {
	async fn rasterize(&self, source: &Path) -> Result<NamedTempFile, MediaError> {
		let raster = tempfile::Builder::new()
			.prefix("ambry-raster-")
			.suffix(".png")
			.tempfile()?;

		trace!(source = %source.display(), "rasterizing vector image");

		let run = Command::new(&self.program)
			.arg(source)
			.arg("-o")
			.arg(raster.path())
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.kill_on_drop(true)
			.output();

		// On timeout the output future is dropped, which kills the child.
		let output = timeout(self.timeout, run)
			.await
			.map_err(|_| MediaError::Timeout {
				tool: self.program.clone(),
				timeout: self.timeout,
			})??;

		if !output.status.success() {
			return Err(MediaError::Tool {
				tool: self.program.clone(),
				status: output.status,
				stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
			});
		}

		Ok(raster)
	}
}
