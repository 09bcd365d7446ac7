//! Container metadata for audio and video files via the external media
//! probe.

use super::{generic::GenericParser, FileParser, ParseError};
use crate::document::DocumentRecord;
use ambry_media::MediaProbe;
use async_trait::async_trait;
use std::{path::Path, sync::Arc};
use tracing::warn;

pub struct MediaParser {
	base: GenericParser,
	probe: Arc<dyn MediaProbe>,
}

impl MediaParser {
	pub fn new(base: GenericParser, probe: Arc<dyn MediaProbe>) -> Self {
		Self { base, probe }
	}
}

#[async_trait]
impl FileParser for MediaParser {
	fn name(&self) -> &'static str {
		"media"
	}

	fn mime_types(&self) -> &'static [&'static str] {
		&["audio/*", "video/*", "application/ogg"]
	}

	async fn parse(
		&self,
		root: &Path,
		path: &Path,
		mime: Option<&str>,
	) -> Result<DocumentRecord, ParseError> {
		let mut record = self.base.base_record(root, path, mime).await?;

		// Probe failure or garbage output degrades to the base record.
		match self.probe.probe(path).await {
			Ok(info) => {
				record.duration = info.duration;
				record.bit_rate = info.bit_rate;
				record.format_name = info.format_name;
				record.format_long_name = info.format_long_name;
				record.width = info.width;
				record.height = info.height;
				record.title = info.tags.get("title").cloned();
				record.album = info.tags.get("album").cloned();
				record.artist = info.tags.get("artist").cloned();
				record.genre = info.tags.get("genre").cloned();
				record.album_artist = info.tags.get("album_artist").cloned();
			}
			Err(err) => warn!(path = %path.display(), %err, "media probe failed"),
		}

		Ok(record)
	}
}
