//! Cell text for spreadsheet workbooks, flattened through the content
//! extractor.

use super::{
	content::{apply_extracted, ContentExtractor},
	generic::GenericParser,
	FileParser, ParseError,
};
use crate::document::DocumentRecord;
use async_trait::async_trait;
use std::{path::Path, sync::Arc};
use tracing::warn;

pub struct SpreadsheetParser {
	base: GenericParser,
	extractor: Arc<dyn ContentExtractor>,
	max_len: usize,
}

impl SpreadsheetParser {
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
impl FileParser for SpreadsheetParser {
	fn name(&self) -> &'static str {
		"spreadsheet"
	}

	fn mime_types(&self) -> &'static [&'static str] {
		&[
			"application/vnd.ms-excel",
			"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
			"application/vnd.oasis.opendocument.spreadsheet",
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
			Err(err) => warn!(path = %path.display(), %err, "spreadsheet extraction failed"),
		}

		Ok(record)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parsing::{
		content::tests::FixedExtractor, content::ExtractedContent,
		generic::tests::test_parser,
	};

	#[tokio::test]
	async fn cell_text_becomes_the_snippet() {
		let root = tempfile::tempdir().unwrap();
		let file = root.path().join("budget.xlsx");
		tokio::fs::write(&file, b"PK fake workbook").await.unwrap();

		let extractor = Arc::new(FixedExtractor(ExtractedContent {
			content: Some("rent 1200 food 450".to_owned()),
			..Default::default()
		}));
		let record = SpreadsheetParser::new(test_parser(Vec::new()), extractor, 4096)
			.parse(
				root.path(),
				&file,
				Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
			)
			.await
			.unwrap();

		assert_eq!(record.content.as_deref(), Some("rent 1200 food 450"));
		assert_eq!(record.name, "budget");
	}
}
