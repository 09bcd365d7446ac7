//! Thumbnail generation for indexed files: per-directory parameters, the
//! on-disk layout and the concurrent engine.
//!
//! Thumbnails live under `<thumbnail root>/<directory id>/<index id>.webp`,
//! so one file per indexed document and one namespace per directory.

mod engine;

pub use engine::ThumbnailEngine;

use crate::{config, storage::Directory};
use std::{
	io,
	path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ThumbnailError {
	#[error("cannot create thumbnail directory {path}: {source}")]
	CreateDir {
		path: PathBuf,
		source: io::Error,
	},
}

/// Per-directory thumbnail parameters, read once at task start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailSpec {
	pub bound: u32,
	pub quality: f32,
	pub background: [u8; 3],
}

impl Default for ThumbnailSpec {
	fn default() -> Self {
		Self {
			bound: 272,
			quality: 85.0,
			background: [0xFF, 0x00, 0xFF],
		}
	}
}

impl ThumbnailSpec {
	/// Malformed option values fall back to the defaults rather than failing
	/// the task.
	pub fn from_directory(directory: &Directory) -> Self {
		let defaults = Self::default();
		Self {
			bound: parse_or(
				directory.option(config::keys::THUMBNAIL_SIZE),
				config::keys::THUMBNAIL_SIZE,
				defaults.bound,
			),
			quality: parse_or(
				directory.option(config::keys::THUMBNAIL_QUALITY),
				config::keys::THUMBNAIL_QUALITY,
				defaults.quality,
			),
			background: parse_color(directory.option(config::keys::THUMBNAIL_COLOR))
				.unwrap_or_else(|| {
					warn!(
						value = directory.option(config::keys::THUMBNAIL_COLOR),
						"malformed thumbnail color, using default"
					);
					defaults.background
				}),
		}
	}

	pub fn params(&self) -> ambry_media::ThumbnailParams {
		ambry_media::ThumbnailParams {
			bound: self.bound,
			quality: self.quality,
			background: self.background,
		}
	}
}

fn parse_or<T: std::str::FromStr + Copy>(value: &str, key: &str, fallback: T) -> T {
	value.parse().unwrap_or_else(|_| {
		warn!(key, value, "malformed thumbnail option, using default");
		fallback
	})
}

/// `RRGGBB` hex, optionally `#`-prefixed.
fn parse_color(value: &str) -> Option<[u8; 3]> {
	let hex = value.strip_prefix('#').unwrap_or(value);
	if hex.len() != 6 {
		return None;
	}
	let mut color = [0u8; 3];
	for (index, channel) in color.iter_mut().enumerate() {
		*channel = u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16).ok()?;
	}
	Some(color)
}

/// The directory-scoped namespace under the thumbnail root.
pub fn namespace_dir(thumbnail_root: &Path, directory_id: i64) -> PathBuf {
	thumbnail_root.join(directory_id.to_string())
}

/// Deletes every thumbnail belonging to one directory. Missing namespace is
/// not an error.
pub async fn remove_namespace(thumbnail_root: &Path, directory_id: i64) -> io::Result<()> {
	match tokio::fs::remove_dir_all(namespace_dir(thumbnail_root, directory_id)).await {
		Ok(()) => Ok(()),
		Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
		Err(err) => Err(err),
	}
}

/// Outcome counters for one thumbnail pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThumbnailStats {
	pub generated: u64,
	pub failed: u64,
	/// Files whose mime has no thumbnail strategy.
	pub skipped: u64,
}

impl std::ops::AddAssign for ThumbnailStats {
	fn add_assign(&mut self, other: Self) {
		self.generated += other.generated;
		self.failed += other.failed;
		self.skipped += other.skipped;
	}
}
