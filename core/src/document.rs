//! The flat, sparse record produced by parsers and consumed by the indexer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Namespace for deterministic index ids. Fixed forever: re-crawling a
/// directory must map every file to the same id so records overwrite
/// instead of duplicating.
pub const INDEX_ID_NAMESPACE: Uuid = Uuid::from_bytes([
	0x8c, 0x5d, 0x1a, 0x0b, 0x8f, 0x44, 0x4e, 0x1f, 0x9a, 0x2d, 0x6b, 0x91, 0x3e, 0x07, 0x5c,
	0xd4,
]);

/// One indexed file. Generic extraction fills the leading fields; the
/// format-specific tail stays `None` unless a specialized parser ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
	pub size: u64,
	/// Directory part relative to the crawl root, `/`-separated, empty at
	/// the root itself.
	pub path: String,
	/// File stem, without extension.
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub extension: Option<String>,
	/// Modification time, seconds since the Unix epoch.
	pub mtime: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mime: Option<String>,
	/// Hex digests keyed by algorithm name.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub checksums: BTreeMap<String, String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub width: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub height: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub bit_rate: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub format_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub format_long_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub encoding: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub font_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub author: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub album: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub artist: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub genre: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub album_artist: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pages: Option<u32>,
}

impl DocumentRecord {
	/// Name with its extension restored, as it appears on disk.
	pub fn file_name(&self) -> String {
		match &self.extension {
			Some(ext) if !ext.is_empty() => format!("{}.{}", self.name, ext),
			_ => self.name.clone(),
		}
	}

	/// Deterministic index identity: a function of the owning directory and
	/// the relative location only, never of content.
	pub fn index_id(&self, directory_id: i64) -> Uuid {
		index_id(directory_id, &self.path, &self.file_name())
	}
}

pub fn index_id(directory_id: i64, rel_path: &str, file_name: &str) -> Uuid {
	let key = format!("{directory_id}:{rel_path}/{file_name}");
	Uuid::new_v5(&INDEX_ID_NAMESPACE, key.as_bytes())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn index_id_is_deterministic_per_path_and_directory() {
		let mut record = DocumentRecord {
			name: "report".to_owned(),
			extension: Some("pdf".to_owned()),
			path: "inbox/2024".to_owned(),
			..Default::default()
		};

		let id = record.index_id(3);
		assert_eq!(id, record.index_id(3));

		// Content changes must not move the record.
		record.size = 123;
		record.content = Some("hello".to_owned());
		assert_eq!(id, record.index_id(3));

		// A different directory or path is a different document.
		assert_ne!(id, record.index_id(4));
		record.path = "inbox/2025".to_owned();
		assert_ne!(id, record.index_id(3));
	}

	#[test]
	fn file_name_restores_extension() {
		let record = DocumentRecord {
			name: "notes".to_owned(),
			extension: Some("txt".to_owned()),
			..Default::default()
		};
		assert_eq!(record.file_name(), "notes.txt");

		let bare = DocumentRecord {
			name: "Makefile".to_owned(),
			..Default::default()
		};
		assert_eq!(bare.file_name(), "Makefile");
	}

	#[test]
	fn sparse_fields_stay_out_of_the_wire_format() {
		let record = DocumentRecord {
			name: "a".to_owned(),
			..Default::default()
		};
		let json = serde_json::to_value(&record).unwrap();
		assert!(json.get("duration").is_none());
		assert!(json.get("checksums").is_none());
		assert!(json.get("size").is_some());
	}
}
