//! Container metadata probing via an external `ffprobe` binary.

use crate::MediaError;
use async_trait::async_trait;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path, process::Stdio, time::Duration};
use tokio::{process::Command, time::timeout};
use tracing::trace;

/// Structured container metadata for one media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
	pub duration: Option<f64>,
	pub bit_rate: Option<u64>,
	pub format_name: Option<String>,
	pub format_long_name: Option<String>,
	pub width: Option<u32>,
	pub height: Option<u32>,
	/// Container tags (title, album, artist, ...), keys lowercased.
	pub tags: BTreeMap<String, String>,
}

/// Capability that turns a media file path into container metadata.
#[async_trait]
pub trait MediaProbe: Send + Sync {
	async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError>;
}

/// [`MediaProbe`] backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
	binary: String,
	timeout: Duration,
}

impl Default for FfprobeProbe {
	fn default() -> Self {
		Self {
			binary: "ffprobe".to_owned(),
			timeout: Duration::from_secs(30),
		}
	}
}

impl FfprobeProbe {
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
impl MediaProbe for FfprobeProbe {
	async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
		trace!(path = %path.display(), "probing media container");

		let run = Command::new(&self.binary)
			.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
			.arg(path)
			.stdin(Stdio::null())
			.kill_on_drop(true)
			.output();

		// Dropping the future on timeout tears the child down via kill_on_drop.
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

		parse_output(&output.stdout).map_err(|reason| MediaError::MalformedOutput {
			tool: self.binary.clone(),
			reason,
		})
	}
}

#[derive(Debug, Deserialize)]
struct RawProbe {
	format: Option<RawFormat>,
	#[serde(default)]
	streams: Vec<RawStream>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
	duration: Option<String>,
	bit_rate: Option<String>,
	format_name: Option<String>,
	format_long_name: Option<String>,
	#[serde(default)]
	tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
	codec_type: Option<String>,
	width: Option<u32>,
	height: Option<u32>,
}

fn parse_output(stdout: &[u8]) -> Result<MediaInfo, String> {
	let raw: RawProbe = serde_json::from_slice(stdout).map_err(|e| e.to_string())?;

	let mut info = MediaInfo::default();

	if let Some(format) = raw.format {
		info.duration = format.duration.as_deref().and_then(|d| d.parse().ok());
		info.bit_rate = format.bit_rate.as_deref().and_then(|b| b.parse().ok());
		info.format_name = format.format_name;
		info.format_long_name = format.format_long_name;
		info.tags = format
			.tags
			.into_iter()
			.map(|(key, value)| (key.to_lowercase(), value))
			.collect();
	}

	// First video stream wins for dimensions.
	if let Some(stream) = raw
		.streams
		.iter()
		.find(|s| s.codec_type.as_deref() == Some("video"))
	{
		info.width = stream.width;
		info.height = stream.height;
	}

	Ok(info)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_format_and_first_video_stream() {
		let json = br#"{
			"streams": [
				{"codec_type": "audio"},
				{"codec_type": "video", "width": 1920, "height": 1080},
				{"codec_type": "video", "width": 640, "height": 480}
			],
			"format": {
				"format_name": "matroska,webm",
				"format_long_name": "Matroska / WebM",
				"duration": "123.456000",
				"bit_rate": "4500000",
				"tags": {"TITLE": "Sample", "artist": "Someone"}
			}
		}"#;

		let info = parse_output(json).unwrap();
		assert_eq!(info.duration, Some(123.456));
		assert_eq!(info.bit_rate, Some(4_500_000));
		assert_eq!(info.format_name.as_deref(), Some("matroska,webm"));
		assert_eq!((info.width, info.height), (Some(1920), Some(1080)));
		assert_eq!(info.tags.get("title").map(String::as_str), Some("Sample"));
		assert_eq!(info.tags.get("artist").map(String::as_str), Some("Someone"));
	}

	#[test]
	fn missing_fields_degrade_to_none() {
		let info = parse_output(b"{}").unwrap();
		assert_eq!(info, MediaInfo::default());
	}

	#[test]
	fn garbage_output_is_rejected() {
		assert!(parse_output(b"not json").is_err());
	}
}
