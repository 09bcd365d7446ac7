use std::{process::ExitStatus, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("image error: {0}")]
	Image(#[from] image::ImageError),

	#[error("webp encoding failed: {0}")]
	Encode(String),

	#[error("{tool} exited with {status}: {stderr}")]
	Tool {
		tool: String,
		status: ExitStatus,
		stderr: String,
	},

	#[error("{tool} did not finish within {timeout:?}")]
	Timeout { tool: String, timeout: Duration },

	#[error("could not parse {tool} output: {reason}")]
	MalformedOutput { tool: String, reason: String },
}
