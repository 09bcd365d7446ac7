//! Display names for sfnt-housed fonts (TTF/OTF).
//!
//! Reads just enough of the `name` table to get a human-readable name; a
//! full font decoder can replace `read_display_name` without touching the
//! parser.

use super::{generic::GenericParser, FileParser, ParseError};
use crate::document::DocumentRecord;
use async_trait::async_trait;
use std::{io, path::Path};
use tracing::warn;

// Fonts with name tables past this point are not worth chasing.
const MAX_FONT_READ: usize = 256 * 1024;

pub struct FontParser {
	base: GenericParser,
}

impl FontParser {
	pub fn new(base: GenericParser) -> Self {
		Self { base }
	}
}

#[async_trait]
impl FileParser for FontParser {
	fn name(&self) -> &'static str {
		"font"
	}

	fn mime_types(&self) -> &'static [&'static str] {
		&[
			"font/ttf",
			"font/otf",
			"font/sfnt",
			"application/font-sfnt",
			"application/x-font-ttf",
			"application/x-font-truetype",
			"application/x-font-opentype",
			"application/vnd.ms-opentype",
		]
	}

	async fn parse(
		&self,
		root: &Path,
		path: &Path,
		mime: Option<&str>,
	) -> Result<DocumentRecord, ParseError> {
		let mut record = self.base.base_record(root, path, mime).await?;

		match read_display_name(path).await {
			Ok(Some(name)) => record.font_name = Some(name),
			Ok(None) => {}
			Err(err) if err.kind() == io::ErrorKind::NotFound => {
				return Err(ParseError::Io(err))
			}
			Err(err) => warn!(path = %path.display(), %err, "unreadable font"),
		}

		Ok(record)
	}
}

async fn read_display_name(path: &Path) -> io::Result<Option<String>> {
	use tokio::io::AsyncReadExt;

	let mut file = tokio::fs::File::open(path).await?;
	let mut data = Vec::new();
	file.take(MAX_FONT_READ as u64).read_to_end(&mut data).await?;
	Ok(parse_sfnt_name(&data))
}

fn be16(data: &[u8], offset: usize) -> Option<u16> {
	Some(u16::from_be_bytes([
		*data.get(offset)?,
		*data.get(offset + 1)?,
	]))
}

fn be32(data: &[u8], offset: usize) -> Option<u32> {
	Some(u32::from_be_bytes([
		*data.get(offset)?,
		*data.get(offset + 1)?,
		*data.get(offset + 2)?,
		*data.get(offset + 3)?,
	]))
}

fn parse_sfnt_name(data: &[u8]) -> Option<String> {
	let num_tables = be16(data, 4)? as usize;

	for index in 0..num_tables {
		let record = 12 + index * 16;
		if data.get(record..record + 4)? == b"name" {
			let offset = be32(data, record + 8)? as usize;
			let length = be32(data, record + 12)? as usize;
			return parse_name_table(data.get(offset..offset.checked_add(length)?)?);
		}
	}
	None
}

/// Prefers the full name (id 4) over the family name (id 1), Windows/
/// Unicode entries over Macintosh ones.
fn parse_name_table(table: &[u8]) -> Option<String> {
	let count = be16(table, 2)? as usize;
	let string_base = be16(table, 4)? as usize;

	let mut best: Option<(u8, String)> = None;

	for index in 0..count {
		let record = 6 + index * 12;
		let platform = be16(table, record)?;
		let name_id = be16(table, record + 6)?;
		let length = be16(table, record + 8)? as usize;
		let offset = be16(table, record + 10)? as usize;

		if name_id != 1 && name_id != 4 {
			continue;
		}

		let start = string_base.checked_add(offset)?;
		let Some(bytes) = table.get(start..start.checked_add(length)?) else {
			continue;
		};

		let decoded = match platform {
			// Unicode and Windows store UTF-16BE.
			0 | 3 => {
				let units: Vec<u16> = bytes
					.chunks_exact(2)
					.map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
					.collect();
				String::from_utf16_lossy(&units)
			}
			_ => bytes.iter().map(|&b| b as char).collect(),
		};
		let decoded = decoded.trim().to_owned();
		if decoded.is_empty() {
			continue;
		}

		let rank = (if name_id == 4 { 2 } else { 0 }) + u8::from(platform == 3 || platform == 0);
		if best.as_ref().map_or(true, |(current, _)| rank > *current) {
			best = Some((rank, decoded));
		}
	}

	best.map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parsing::generic::tests::test_parser;

	/// Minimal sfnt blob: one `name` table holding a single Windows
	/// full-name entry.
	fn fake_font(full_name: &str) -> Vec<u8> {
		let utf16: Vec<u8> = full_name
			.encode_utf16()
			.flat_map(|unit| unit.to_be_bytes())
			.collect();

		let mut name_table = Vec::new();
		name_table.extend_from_slice(&0u16.to_be_bytes()); // format
		name_table.extend_from_slice(&1u16.to_be_bytes()); // count
		name_table.extend_from_slice(&18u16.to_be_bytes()); // string offset
		name_table.extend_from_slice(&3u16.to_be_bytes()); // platform: windows
		name_table.extend_from_slice(&1u16.to_be_bytes()); // encoding
		name_table.extend_from_slice(&0x0409u16.to_be_bytes()); // language
		name_table.extend_from_slice(&4u16.to_be_bytes()); // name id: full name
		name_table.extend_from_slice(&(utf16.len() as u16).to_be_bytes());
		name_table.extend_from_slice(&0u16.to_be_bytes()); // string offset in pool
		name_table.extend_from_slice(&utf16);

		let mut font = Vec::new();
		font.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]); // sfnt version
		font.extend_from_slice(&1u16.to_be_bytes()); // table count
		font.extend_from_slice(&[0u8; 6]); // search range et al.
		font.extend_from_slice(b"name");
		font.extend_from_slice(&[0u8; 4]); // checksum
		font.extend_from_slice(&28u32.to_be_bytes()); // table offset
		font.extend_from_slice(&(name_table.len() as u32).to_be_bytes());
		font.extend_from_slice(&name_table);
		font
	}

	#[test]
	fn extracts_the_windows_full_name() {
		assert_eq!(
			parse_sfnt_name(&fake_font("Liberation Sans Bold")).as_deref(),
			Some("Liberation Sans Bold")
		);
	}

	#[test]
	fn garbage_is_not_a_name() {
		assert_eq!(parse_sfnt_name(b"definitely not a font"), None);
		assert_eq!(parse_sfnt_name(b""), None);
	}

	#[tokio::test]
	async fn malformed_font_degrades_to_partial_record() {
		let root = tempfile::tempdir().unwrap();
		let file = root.path().join("broken.ttf");
		tokio::fs::write(&file, b"\x00\x01\x00\x00junk").await.unwrap();

		let record = FontParser::new(test_parser(Vec::new()))
			.parse(root.path(), &file, Some("font/ttf"))
			.await
			.unwrap();
		assert_eq!(record.font_name, None);
		assert_eq!(record.name, "broken");
	}

	#[tokio::test]
	async fn well_formed_font_sets_display_name() {
		let root = tempfile::tempdir().unwrap();
		let file = root.path().join("sans.ttf");
		tokio::fs::write(&file, fake_font("Test Sans")).await.unwrap();

		let record = FontParser::new(test_parser(Vec::new()))
			.parse(root.path(), &file, Some("font/ttf"))
			.await
			.unwrap();
		assert_eq!(record.font_name.as_deref(), Some("Test Sans"));
	}
}
