//! File parsing capability: one record per file, dispatched by mime type.
//!
//! Parsers declare the mime set they claim (exact strings or `family/*`
//! wildcards); a [`ParserRegistry`] built once per task maps mime to parser
//! and holds exactly one default for everything unclaimed. Format-level
//! malformation degrades to a partial record; only catastrophic I/O errors
//! propagate.

pub mod checksum;
pub mod content;
pub mod document;
pub mod ebook;
pub mod font;
pub mod generic;
pub mod media;
pub mod mime;
pub mod picture;
pub mod spreadsheet;
pub mod text;

pub use content::{ContentExtractor, ExtractedContent, NoopExtractor};
pub use mime::MimeGuesser;

use crate::{config, document::DocumentRecord, storage::Directory};
use ambry_media::MediaProbe;
use async_trait::async_trait;
use checksum::ChecksumKind;
use std::{collections::HashMap, path::Path, sync::Arc};
use thiserror::Error;

/// Catastrophic per-file failure. `NotFound` is the expected vanished-file
/// race and is skipped by the crawler; everything else is logged and
/// skipped too.
#[derive(Debug, Error)]
pub enum ParseError {
	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),
}

impl ParseError {
	pub fn is_vanished(&self) -> bool {
		let Self::Io(err) = self;
		err.kind() == std::io::ErrorKind::NotFound
	}
}

/// Extracts a [`DocumentRecord`] from one file.
#[async_trait]
pub trait FileParser: Send + Sync {
	fn name(&self) -> &'static str;

	/// Claimed mime set: exact strings (`"application/pdf"`) or family
	/// wildcards (`"image/*"`). Empty for the default parser.
	fn mime_types(&self) -> &'static [&'static str];

	/// Whether this parser handles files no other parser claims. Exactly
	/// one default must exist per registry.
	fn is_default(&self) -> bool {
		false
	}

	async fn parse(
		&self,
		root: &Path,
		path: &Path,
		mime: Option<&str>,
	) -> Result<DocumentRecord, ParseError>;
}

/// Registry misconfiguration. Fatal at task start, never mid-crawl.
#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("no default parser configured")]
	NoDefault,

	#[error("multiple default parsers configured: {0} and {1}")]
	MultipleDefaults(&'static str, &'static str),

	#[error("unknown parser family in FileParsers option: {0}")]
	UnknownFamily(String),
}

/// Static mime-to-parser dispatch, built once per task.
pub struct ParserRegistry {
	parsers: Vec<Arc<dyn FileParser>>,
	exact: HashMap<&'static str, usize>,
	families: HashMap<&'static str, usize>,
	default_index: usize,
}

impl std::fmt::Debug for ParserRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ParserRegistry")
			.field(
				"parsers",
				&self.parsers.iter().map(|p| p.name()).collect::<Vec<_>>(),
			)
			.field("exact", &self.exact)
			.field("families", &self.families)
			.field("default_index", &self.default_index)
			.finish()
	}
}

impl ParserRegistry {
	pub fn new(parsers: Vec<Arc<dyn FileParser>>) -> Result<Self, RegistryError> {
		let mut exact = HashMap::new();
		let mut families = HashMap::new();
		let mut default_index = None;

		for (index, parser) in parsers.iter().enumerate() {
			if parser.is_default() {
				if let Some(existing) = default_index {
					let first: &Arc<dyn FileParser> = &parsers[existing];
					return Err(RegistryError::MultipleDefaults(
						first.name(),
						parser.name(),
					));
				}
				default_index = Some(index);
			}

			for claimed in parser.mime_types() {
				match claimed.strip_suffix("/*") {
					Some(family) => families.insert(family, index),
					None => exact.insert(*claimed, index),
				};
			}
		}

		Ok(Self {
			parsers,
			exact,
			families,
			default_index: default_index.ok_or(RegistryError::NoDefault)?,
		})
	}

	/// Exact claim first, then the `family/*` wildcard, then the default.
	/// Unclassifiable files always resolve to the default.
	pub fn resolve(&self, mime: Option<&str>) -> &Arc<dyn FileParser> {
		let index = mime
			.and_then(|m| {
				self.exact
					.get(m)
					.or_else(|| self.families.get(m.split('/').next().unwrap_or(m)))
					.copied()
			})
			.unwrap_or(self.default_index);
		&self.parsers[index]
	}

	pub fn default_parser(&self) -> &Arc<dyn FileParser> {
		&self.parsers[self.default_index]
	}
}

/// Per-task extraction settings derived from directory options.
#[derive(Debug, Clone)]
pub struct ParserSettings {
	pub checksums: Vec<ChecksumKind>,
	pub content_length: usize,
	pub text_content_length: usize,
}

impl ParserSettings {
	pub fn from_directory(directory: &Directory) -> Self {
		Self {
			checksums: ChecksumKind::parse_list(
				directory.option(config::keys::CHECKSUM_CALCULATORS),
			),
			content_length: directory
				.option(config::keys::CONTENT_LENGTH)
				.parse()
				.unwrap_or(4096),
			text_content_length: directory
				.option(config::keys::TEXT_FILE_CONTENT_LENGTH)
				.parse()
				.unwrap_or(4096),
		}
	}
}

/// Builds the registry for one task from the directory's `FileParsers`
/// option. The generic default parser is always present; unknown family
/// names are a configuration error.
pub fn build_registry(
	directory: &Directory,
	probe: Arc<dyn MediaProbe>,
	extractor: Arc<dyn ContentExtractor>,
) -> Result<ParserRegistry, RegistryError> {
	let settings = ParserSettings::from_directory(directory);
	let base = generic::GenericParser::new(settings.clone());

	let mut parsers: Vec<Arc<dyn FileParser>> = vec![Arc::new(base.clone())];

	for family in directory
		.option(config::keys::FILE_PARSERS)
		.split(',')
		.map(str::trim)
		.filter(|name| !name.is_empty())
	{
		let parser: Arc<dyn FileParser> = match family {
			"media" => Arc::new(media::MediaParser::new(base.clone(), probe.clone())),
			"text" => Arc::new(text::TextParser::new(
				base.clone(),
				settings.text_content_length,
			)),
			"picture" => Arc::new(picture::PictureParser::new(base.clone())),
			"font" => Arc::new(font::FontParser::new(base.clone())),
			"document" => Arc::new(document::DocumentParser::new(
				base.clone(),
				extractor.clone(),
				settings.content_length,
			)),
			"spreadsheet" => Arc::new(spreadsheet::SpreadsheetParser::new(
				base.clone(),
				extractor.clone(),
				settings.content_length,
			)),
			"ebook" => Arc::new(ebook::EbookParser::new(
				base.clone(),
				extractor.clone(),
				settings.content_length,
			)),
			unknown => return Err(RegistryError::UnknownFamily(unknown.to_owned())),
		};
		parsers.push(parser);
	}

	ParserRegistry::new(parsers)
}

/// Cuts `text` so its UTF-8 encoding fits in `max_bytes`, on a char
/// boundary.
pub(crate) fn truncate_text(text: &str, max_bytes: usize) -> &str {
	if text.len() <= max_bytes {
		return text;
	}
	let mut end = max_bytes;
	while !text.is_char_boundary(end) {
		end -= 1;
	}
	&text[..end]
}

#[cfg(test)]
mod tests {
	use super::*;

	struct StubParser {
		name: &'static str,
		mimes: &'static [&'static str],
		default: bool,
	}

	#[async_trait]
	impl FileParser for StubParser {
		fn name(&self) -> &'static str {
			self.name
		}

		fn mime_types(&self) -> &'static [&'static str] {
			self.mimes
		}

		fn is_default(&self) -> bool {
			self.default
		}

		async fn parse(
			&self,
			_root: &Path,
			_path: &Path,
			_mime: Option<&str>,
		) -> Result<DocumentRecord, ParseError> {
			Ok(DocumentRecord::default())
		}
	}

	fn stub(
		name: &'static str,
		mimes: &'static [&'static str],
		default: bool,
	) -> Arc<dyn FileParser> {
		Arc::new(StubParser {
			name,
			mimes,
			default,
		})
	}

	#[test]
	fn dispatch_prefers_exact_then_family_then_default() {
		let registry = ParserRegistry::new(vec![
			stub("generic", &[], true),
			stub("picture", &["image/*"], false),
			stub("svg", &["image/svg+xml"], false),
		])
		.unwrap();

		assert_eq!(registry.resolve(Some("image/svg+xml")).name(), "svg");
		assert_eq!(registry.resolve(Some("image/png")).name(), "picture");
		assert_eq!(registry.resolve(Some("application/pdf")).name(), "generic");
		assert_eq!(registry.resolve(None).name(), "generic");
	}

	#[test]
	fn zero_defaults_is_a_configuration_error() {
		let err = ParserRegistry::new(vec![stub("picture", &["image/*"], false)]).unwrap_err();
		assert!(matches!(err, RegistryError::NoDefault));
	}

	#[test]
	fn multiple_defaults_is_a_configuration_error() {
		let err = ParserRegistry::new(vec![
			stub("generic", &[], true),
			stub("also-generic", &[], true),
		])
		.unwrap_err();
		assert!(matches!(err, RegistryError::MultipleDefaults(_, _)));
	}

	#[test]
	fn registry_from_directory_options() {
		let directory = crate::storage::Directory::new("/data", "data");
		let registry = build_registry(
			&directory,
			Arc::new(media::tests::NullProbe),
			Arc::new(NoopExtractor),
		)
		.unwrap();

		assert_eq!(registry.resolve(Some("video/mp4")).name(), "media");
		assert_eq!(registry.resolve(Some("text/plain")).name(), "text");
		assert_eq!(registry.resolve(Some("application/pdf")).name(), "document");
		assert_eq!(registry.default_parser().name(), "generic");
	}

	#[test]
	fn unknown_family_is_rejected() {
		let mut directory = crate::storage::Directory::new("/data", "data");
		directory.set_option(config::keys::FILE_PARSERS, "text, tika");
		let err = build_registry(
			&directory,
			Arc::new(media::tests::NullProbe),
			Arc::new(NoopExtractor),
		)
		.unwrap_err();
		assert!(matches!(err, RegistryError::UnknownFamily(name) if name == "tika"));
	}

	#[test]
	fn truncation_respects_char_boundaries() {
		assert_eq!(truncate_text("hello", 10), "hello");
		assert_eq!(truncate_text("hello", 3), "hel");
		// 'é' is two bytes; cutting inside it must back up.
		assert_eq!(truncate_text("héllo", 2), "h");
	}
}
