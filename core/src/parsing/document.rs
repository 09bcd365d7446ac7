//! Text and metadata for page-oriented documents (PDF, word processing).

use super::{
	content::{apply_extracted, ContentExtractor},
	generic::GenericParser,
	FileParser, ParseError,
};
use crate::document::DocumentRecord;
use async_trait::async_trait;
use std::{path::Path, sync::Arc};
use tracing::warn;

pub struct DocumentParser {
	base: GenericParser,
	extractor: Arc<dyn ContentExtractor>,
	max_len: usize,
}

impl DocumentParser {
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
impl FileParser for DocumentParser {
	fn name(&self) -> &'static str {
		"document"
	}

	fn mime_types(&self) -> &'static [&'static str] {
		&[
			"application/pdf",
			"application/msword",
			"application/rtf",
			"application/vnd.openxmlformats-officedocument.wordprocessingml.document",
			"application/vnd.oasis.opendocument.text",
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
			Err(err) => warn!(path = %path.display(), %err, "document extraction failed"),
		}

		Ok(record)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parsing::{
		content::tests::{FailingExtractor, FixedExtractor},
		content::ExtractedContent,
		generic::tests::test_parser,
	};

	#[tokio::test]
	async fn extracted_fields_land_on_the_record() {
		let root = tempfile::tempdir().unwrap();
		let file = root.path().join("report.pdf");
		tokio::fs::write(&file, b"%PDF-1.7 fake").await.unwrap();

		let extractor = Arc::new(FixedExtractor(ExtractedContent {
			content: Some("quarterly numbers".to_owned()),
			title: Some("Q3 Report".to_owned()),
			author: Some("Finance".to_owned()),
			pages: Some(42),
		}));
		let record = DocumentParser::new(test_parser(Vec::new()), extractor, 4096)
			.parse(root.path(), &file, Some("application/pdf"))
			.await
			.unwrap();

		assert_eq!(record.content.as_deref(), Some("quarterly numbers"));
		assert_eq!(record.title.as_deref(), Some("Q3 Report"));
		assert_eq!(record.author.as_deref(), Some("Finance"));
		assert_eq!(record.pages, Some(42));
	}

	#[tokio::test]
	async fn extractor_failure_keeps_the_base_record() {
		let root = tempfile::tempdir().unwrap();
		let file = root.path().join("broken.pdf");
		tokio::fs::write(&file, b"not a pdf").await.unwrap();

		let record = DocumentParser::new(test_parser(Vec::new()), Arc::new(FailingExtractor), 4096)
			.parse(root.path(), &file, Some("application/pdf"))
			.await
			.unwrap();

		assert_eq!(record.content, None);
		assert_eq!(record.name, "broken");
	}
}
