//! Option keys, their seeded defaults and fixed tuning constants.

use once_cell::sync::Lazy;
use std::{collections::BTreeMap, time::Duration};

/// Per-directory option keys. Values live in the external store; unknown or
/// missing keys fall back to [`default_option`].
pub mod keys {
	pub const THUMBNAIL_QUALITY: &str = "ThumbnailQuality";
	pub const THUMBNAIL_SIZE: &str = "ThumbnailSize";
	pub const THUMBNAIL_COLOR: &str = "ThumbnailColor";
	pub const CONTENT_LENGTH: &str = "ContentLength";
	pub const TEXT_FILE_CONTENT_LENGTH: &str = "TextFileContentLength";
	pub const MIME_GUESSER: &str = "MimeGuesser";
	pub const CHECKSUM_CALCULATORS: &str = "CheckSumCalculators";
	pub const FILE_PARSERS: &str = "FileParsers";
}

/// Defaults seeded into every new directory and used as fallback for reads.
pub static DEFAULT_OPTIONS: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
	BTreeMap::from([
		(keys::THUMBNAIL_QUALITY, "85"),
		(keys::THUMBNAIL_SIZE, "272"),
		(keys::THUMBNAIL_COLOR, "FF00FF"),
		(keys::CONTENT_LENGTH, "4096"),
		(keys::TEXT_FILE_CONTENT_LENGTH, "4096"),
		// extension | content
		(keys::MIME_GUESSER, "extension"),
		// comma-separated subset of: md5, sha1, sha256
		(keys::CHECKSUM_CALCULATORS, ""),
		(
			keys::FILE_PARSERS,
			"media, text, picture, font, document, spreadsheet, ebook",
		),
	])
});

pub fn default_option(key: &str) -> Option<&'static str> {
	DEFAULT_OPTIONS.get(key).copied()
}

/// Records are flushed to the indexer after this many parsed files.
pub const INDEX_BATCH_SIZE: usize = 10_000;

/// Block size for streamed checksum reads.
pub const CHECKSUM_BLOCK_SIZE: usize = 64 * 1024;

/// Extra bytes read past the content bound for encoding detection.
pub const ENCODING_PROBE_WINDOW: usize = 4096;

/// Fixed interval of the task manager poll loop.
pub const TASK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Capacity of the thumbnail engine work queue.
pub const THUMBNAIL_QUEUE_CAPACITY: usize = 8192;

/// Backoff between enqueue retries when the thumbnail queue is full.
pub const THUMBNAIL_ENQUEUE_RETRY: Duration = Duration::from_millis(100);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_key_has_a_default() {
		for key in [
			keys::THUMBNAIL_QUALITY,
			keys::THUMBNAIL_SIZE,
			keys::THUMBNAIL_COLOR,
			keys::CONTENT_LENGTH,
			keys::TEXT_FILE_CONTENT_LENGTH,
			keys::MIME_GUESSER,
			keys::CHECKSUM_CALCULATORS,
			keys::FILE_PARSERS,
		] {
			assert!(default_option(key).is_some(), "missing default for {key}");
		}
		assert_eq!(default_option("NoSuchKey"), None);
	}
}
