//! Pluggable content extraction for container formats (PDF, office
//! documents, ebooks).
//!
//! The bit-level decoders stay external; the parsers only own truncation
//! and field mapping. The default implementation extracts nothing, which
//! degrades those families to generic extraction.

use crate::document::DocumentRecord;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
	pub content: Option<String>,
	pub title: Option<String>,
	pub author: Option<String>,
	pub pages: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("decoder failed: {0}")]
	Decoder(String),
}

/// Capability that pulls text and document metadata out of one file.
/// `max_len` bounds how much text the implementation needs to produce.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
	async fn extract(&self, path: &Path, max_len: usize)
		-> Result<ExtractedContent, ExtractError>;
}

/// Default extractor: no content, no metadata.
pub struct NoopExtractor;

#[async_trait]
impl ContentExtractor for NoopExtractor {
	async fn extract(
		&self,
		_path: &Path,
		_max_len: usize,
	) -> Result<ExtractedContent, ExtractError> {
		Ok(ExtractedContent::default())
	}
}

/// Copies extracted fields onto the record, truncating the snippet to the
/// configured bound.
pub(crate) fn apply_extracted(
	record: &mut DocumentRecord,
	extracted: ExtractedContent,
	max_len: usize,
) {
	if let Some(content) = extracted.content {
		let snippet = super::truncate_text(&content, max_len);
		if !snippet.is_empty() {
			record.content = Some(snippet.to_owned());
		}
	}
	record.title = extracted.title.or(record.title.take());
	record.author = extracted.author.or(record.author.take());
	record.pages = extracted.pages.or(record.pages.take());
}
