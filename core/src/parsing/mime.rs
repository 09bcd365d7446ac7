//! Mime classification, either from the file name or from leading content
//! bytes.

use std::{path::Path, str::FromStr};
use strum::EnumString;
use tokio::{fs::File, io::AsyncReadExt};
use tracing::warn;

const SNIFF_WINDOW: usize = 64;

/// Strategy selected by the `MimeGuesser` directory option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MimeGuesser {
	#[default]
	Extension,
	Content,
}

impl MimeGuesser {
	pub fn from_option(value: &str) -> Self {
		Self::from_str(value).unwrap_or_else(|_| {
			warn!(value, "unknown mime guesser, falling back to extension");
			Self::Extension
		})
	}

	/// `None` means unclassifiable; the crawler routes those to the default
	/// parser.
	pub async fn guess(&self, path: &Path) -> Option<String> {
		match self {
			Self::Extension => from_extension(path),
			// Content sniffing falls back to the extension for formats the
			// magic table does not cover.
			Self::Content => match sniff(path).await {
				Some(mime) => Some(mime.to_owned()),
				None => from_extension(path),
			},
		}
	}
}

fn from_extension(path: &Path) -> Option<String> {
	mime_guess::from_path(path).first_raw().map(str::to_owned)
}

async fn sniff(path: &Path) -> Option<&'static str> {
	let mut head = [0u8; SNIFF_WINDOW];
	let mut file = File::open(path).await.ok()?;
	let mut filled = 0;
	while filled < head.len() {
		match file.read(&mut head[filled..]).await {
			Ok(0) => break,
			Ok(n) => filled += n,
			Err(_) => return None,
		}
	}
	sniff_bytes(&head[..filled])
}

/// Magic-byte classification for the formats the pipeline cares most about.
fn sniff_bytes(head: &[u8]) -> Option<&'static str> {
	if head.starts_with(b"\x89PNG\r\n\x1a\n") {
		return Some("image/png");
	}
	if head.starts_with(b"\xFF\xD8\xFF") {
		return Some("image/jpeg");
	}
	if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
		return Some("image/gif");
	}
	if head.starts_with(b"BM") && head.len() >= 14 {
		return Some("image/bmp");
	}
	if head.starts_with(b"II*\x00") || head.starts_with(b"MM\x00*") {
		return Some("image/tiff");
	}
	if head.starts_with(b"%PDF") {
		return Some("application/pdf");
	}
	if head.starts_with(b"OggS") {
		return Some("application/ogg");
	}
	if head.starts_with(b"fLaC") {
		return Some("audio/flac");
	}
	if head.starts_with(b"ID3") || head.starts_with(b"\xFF\xFB") {
		return Some("audio/mpeg");
	}
	if head.starts_with(b"\x1A\x45\xDF\xA3") {
		return Some("video/x-matroska");
	}
	if head.len() >= 12 && &head[4..8] == b"ftyp" {
		return Some("video/mp4");
	}
	if head.starts_with(b"RIFF") && head.len() >= 12 {
		return match &head[8..12] {
			b"WAVE" => Some("audio/wav"),
			b"AVI " => Some("video/x-msvideo"),
			b"WEBP" => Some("image/webp"),
			_ => None,
		};
	}
	if head.starts_with(b"\x00\x01\x00\x00") || head.starts_with(b"true") {
		return Some("font/ttf");
	}
	if head.starts_with(b"OTTO") {
		return Some("font/otf");
	}
	if head.starts_with(b"wOFF") {
		return Some("font/woff");
	}
	if head.starts_with(b"PK\x03\x04") {
		return Some("application/zip");
	}
	if head.starts_with(b"\x1F\x8B") {
		return Some("application/gzip");
	}
	None
}
