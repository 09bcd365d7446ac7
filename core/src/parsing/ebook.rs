//! Ebook text and bibliographic metadata through the content extractor.

use super::{
	content::{apply_extracted, ContentExtractor},
	generic::GenericParser,
	FileParser, ParseError,
};
use crate::document::DocumentRecord;
use async_trait::async_trait;
use std::{path::Path, sync::Arc};
use tracing::warn;

pub struct EbookParser {
	base: GenericParser,
	extractor: Arc<dyn ContentExtractor>,
	max_len: usize,
}

impl EbookParser {
	pub fn new(
		base: GenericParser,
		extractor: Arc<dyn ContentExtractor>,
		max_len: usize,
	) -> Self {
		Self {
			base,
			extractor,
			max_len,
		}
	}
}

#[async_trait]
impl FileParser for EbookParser {
	fn name(&self) -> &'static str {
		"ebook"
	}

	fn mime_types(&self) -> &'static [&'static str] {
		&[
			"application/epub+zip",
			"application/x-mobipocket-ebook",
			"application/vnd.amazon.ebook",
		]
	}

	async fn parse(
		&self,
		root: &Path,
		path: &Path,
		mime: Option<&str>,
	) -> Result<DocumentRecord, ParseError> {
		let mut record = self.base.base_record(root, path, mime).await?;

		match self.extractor.extract(path, self.max_len).await {
			Ok(extracted) => apply_extracted(&mut record, extracted, self.max_len),
			Err(err) => warn!(path = %path.display(), %err, "ebook extraction failed"),
		}

		Ok(record)
	}
}
