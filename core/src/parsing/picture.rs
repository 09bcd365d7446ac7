//! Raster image dimensions from the header, without decoding pixel data.

use super::{generic::GenericParser, FileParser, ParseError};
use crate::document::DocumentRecord;
use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

pub struct PictureParser {
	base: GenericParser,
}

impl PictureParser {
	pub fn new(base: GenericParser) -> Self {
		Self { base }
	}
}

#[async_trait]
impl FileParser for PictureParser {
	fn name(&self) -> &'static str {
		"picture"
	}

	fn mime_types(&self) -> &'static [&'static str] {
		&["image/*"]
	}

	async fn parse(
		&self,
		root: &Path,
		path: &Path,
		mime: Option<&str>,
	) -> Result<DocumentRecord, ParseError> {
		let mut record = self.base.base_record(root, path, mime).await?;

		// Header-only read; malformed images degrade to the base record.
		match image::image_dimensions(path) {
			Ok((width, height)) => {
				record.width = Some(width);
				record.height = Some(height);
			}
			Err(err) => warn!(path = %path.display(), %err, "unreadable image header"),
		}

		Ok(record)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parsing::generic::tests::test_parser;

	#[tokio::test]
	async fn dimensions_from_header() {
		let root = tempfile::tempdir().unwrap();
		let file = root.path().join("img.png");
		image::RgbImage::new(420, 315).save(&file).unwrap();

		let record = PictureParser::new(test_parser(Vec::new()))
			.parse(root.path(), &file, Some("image/png"))
			.await
			.unwrap();

		assert_eq!((record.width, record.height), (Some(420), Some(315)));
	}

	#[tokio::test]
	async fn corrupt_image_degrades_to_partial_record() {
		let root = tempfile::tempdir().unwrap();
		let file = root.path().join("broken.png");
		tokio::fs::write(&file, b"\x89PNG but not really").await.unwrap();

		let record = PictureParser::new(test_parser(Vec::new()))
			.parse(root.path(), &file, Some("image/png"))
			.await
			.unwrap();

		assert_eq!(record.width, None);
		assert_eq!(record.name, "broken");
		assert_eq!(record.size, 19);
	}
}
