//! Base extraction shared by every parser family: stat fields, relative
//! location, checksums and the mime the crawler resolved.

use super::{checksum, FileParser, ParseError, ParserSettings};
use crate::document::DocumentRecord;
use async_trait::async_trait;
use std::{
	path::Path,
	time::{SystemTime, UNIX_EPOCH},
};
use tracing::warn;

/// The default parser: generic extraction, claims no mime types.
#[derive(Clone)]
pub struct GenericParser {
	settings: ParserSettings,
}

impl GenericParser {
	pub fn new(settings: ParserSettings) -> Self {
		Self { settings }
	}

	/// Builds the base record every specialized parser extends.
	pub(crate) async fn base_record(
		&self,
		root: &Path,
		path: &Path,
		mime: Option<&str>,
	) -> Result<DocumentRecord, ParseError> {
		let metadata = tokio::fs::metadata(path).await?;

		let name = path
			.file_stem()
			.map(|stem| stem.to_string_lossy().into_owned())
			.unwrap_or_default();
		let extension = path
			.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase());

		let rel_dir = path
			.parent()
			.and_then(|parent| parent.strip_prefix(root).ok())
			.map(|rel| {
				rel.components()
					.map(|c| c.as_os_str().to_string_lossy())
					.collect::<Vec<_>>()
					.join("/")
			})
			.unwrap_or_default();

		let mtime = metadata
			.modified()
			.ok()
			.and_then(|m| m.duration_since(UNIX_EPOCH).ok())
			.map(|d| d.as_secs() as i64)
			.unwrap_or_else(|| {
				SystemTime::now()
					.duration_since(UNIX_EPOCH)
					.map(|d| d.as_secs() as i64)
					.unwrap_or(0)
			});

		let mut record = DocumentRecord {
			size: metadata.len(),
			path: rel_dir,
			name,
			extension,
			mtime,
			mime: mime.map(str::to_owned),
			..Default::default()
		};

		for kind in &self.settings.checksums {
			match checksum::checksum_file(*kind, path).await {
				Ok(digest) => {
					record.checksums.insert(kind.to_string(), digest);
				}
				// Unreadable for hashing: keep the record, drop the digest.
				Err(err) => warn!(path = %path.display(), %kind, %err, "checksum failed"),
			}
		}

		Ok(record)
	}
}

#[async_trait]
impl FileParser for GenericParser {
	fn name(&self) -> &'static str {
		"generic"
	}

	fn mime_types(&self) -> &'static [&'static str] {
		&[]
	}

	fn is_default(&self) -> bool {
		true
	}

	async fn parse(
		&self,
		root: &Path,
		path: &Path,
		mime: Option<&str>,
	) -> Result<DocumentRecord, ParseError> {
		self.base_record(root, path, mime).await
	}
}
