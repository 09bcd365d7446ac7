//! Text extraction with bounded reads and encoding detection.
//!
//! At most the configured content length plus a fixed probe window is read;
//! the snippet stored on the record never exceeds the configured length.

use super::{generic::GenericParser, truncate_text, FileParser, ParseError};
use crate::{config::ENCODING_PROBE_WINDOW, document::DocumentRecord};
use async_trait::async_trait;
use std::path::Path;
use tokio::{fs::File, io::AsyncReadExt};

pub struct TextParser {
	base: GenericParser,
	max_len: usize,
}

impl TextParser {
	pub fn new(base: GenericParser, max_len: usize) -> Self {
		Self { base, max_len }
	}
}

#[async_trait]
impl FileParser for TextParser {
	fn name(&self) -> &'static str {
		"text"
	}

	fn mime_types(&self) -> &'static [&'static str] {
		&["text/*"]
	}

	async fn parse(
		&self,
		root: &Path,
		path: &Path,
		mime: Option<&str>,
	) -> Result<DocumentRecord, ParseError> {
		let mut record = self.base.base_record(root, path, mime).await?;

		let mut file = File::open(path).await?;
		let mut buf = Vec::with_capacity(self.max_len.min(64 * 1024));
		file.take((self.max_len + ENCODING_PROBE_WINDOW) as u64)
			.read_to_end(&mut buf)
			.await?;

		let (encoding, decoded) = decode(&buf);
		record.encoding = Some(encoding.to_owned());
		let snippet = truncate_text(&decoded, self.max_len);
		if !snippet.is_empty() {
			record.content = Some(snippet.to_owned());
		}

		Ok(record)
	}
}

/// BOM sniffing, then UTF-8 validation, then a latin-1 fallback that cannot
/// fail. Returns the detected encoding label and the decoded text.
fn decode(buf: &[u8]) -> (&'static str, String) {
	if let Some(stripped) = buf.strip_prefix(b"\xEF\xBB\xBF") {
		return ("utf-8", String::from_utf8_lossy(stripped).into_owned());
	}
	if let Some(stripped) = buf.strip_prefix(b"\xFF\xFE") {
		return ("utf-16le", decode_utf16(stripped, u16::from_le_bytes));
	}
	if let Some(stripped) = buf.strip_prefix(b"\xFE\xFF") {
		return ("utf-16be", decode_utf16(stripped, u16::from_be_bytes));
	}
	match std::str::from_utf8(buf) {
		Ok(text) => ("utf-8", text.to_owned()),
		// A bounded read can split a multi-byte sequence at the tail; only
		// fall back when the prefix before the error is not the whole story.
		Err(err) if err.valid_up_to() + 4 >= buf.len() => (
			"utf-8",
			String::from_utf8_lossy(&buf[..err.valid_up_to()]).into_owned(),
		),
		Err(_) => (
			"iso-8859-1",
			buf.iter().map(|&b| b as char).collect::<String>(),
		),
	}
}

fn decode_utf16(buf: &[u8], combine: fn([u8; 2]) -> u16) -> String {
	let units: Vec<u16> = buf
		.chunks_exact(2)
		.map(|pair| combine([pair[0], pair[1]]))
		.collect();
	String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parsing::generic::tests::test_parser;

	async fn parse_bytes(content: &[u8], max_len: usize) -> DocumentRecord {
		let root = tempfile::tempdir().unwrap();
		let file = root.path().join("file.txt");
		tokio::fs::write(&file, content).await.unwrap();

		TextParser::new(test_parser(Vec::new()), max_len)
			.parse(root.path(), &file, Some("text/plain"))
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn utf8_content_and_encoding() {
		let record = parse_bytes("héllo wörld".as_bytes(), 4096).await;
		assert_eq!(record.encoding.as_deref(), Some("utf-8"));
		assert_eq!(record.content.as_deref(), Some("héllo wörld"));
	}

	#[tokio::test]
	async fn content_is_truncated_to_the_configured_length() {
		let record = parse_bytes(&[b'a'; 10_000], 100).await;
		assert_eq!(record.content.as_deref().map(str::len), Some(100));
	}

	#[tokio::test]
	async fn latin1_fallback() {
		// 0xE9 is 'é' in latin-1 and invalid leading UTF-8 mid-stream.
		let record = parse_bytes(b"caf\xE9 au lait", 4096).await;
		assert_eq!(record.encoding.as_deref(), Some("iso-8859-1"));
		assert_eq!(record.content.as_deref(), Some("café au lait"));
	}

	#[tokio::test]
	async fn utf16le_bom() {
		let mut bytes = vec![0xFF, 0xFE];
		for unit in "hi".encode_utf16() {
			bytes.extend_from_slice(&unit.to_le_bytes());
		}
		let record = parse_bytes(&bytes, 4096).await;
		assert_eq!(record.encoding.as_deref(), Some("utf-16le"));
		assert_eq!(record.content.as_deref(), Some("hi"));
	}

	#[tokio::test]
	async fn empty_file_has_no_snippet() {
		let record = parse_bytes(b"", 4096).await;
		assert_eq!(record.content, None);
		assert_eq!(record.encoding.as_deref(), Some("utf-8"));
	}
}
