//! Streamed content digests. One pass per configured algorithm, fixed-size
//! blocks, memory independent of file size.

use crate::config::CHECKSUM_BLOCK_SIZE;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::{io, path::Path};
use strum::{Display, EnumString};
use tokio::{fs::File, io::AsyncReadExt};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ChecksumKind {
	Md5,
	Sha1,
	Sha256,
}

impl ChecksumKind {
	/// Parses the comma-separated `CheckSumCalculators` option value.
	/// Unknown names are dropped with a warning.
	pub fn parse_list(value: &str) -> Vec<ChecksumKind> {
		value
			.split(',')
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.filter_map(|name| match name.parse() {
				Ok(kind) => Some(kind),
				Err(_) => {
					warn!(name, "unknown checksum algorithm, skipping");
					None
				}
			})
			.collect()
	}
}

/// Uppercase hex digest of a file's bytes. Fails only when the file cannot
/// be read; callers skip the algorithm and keep the record.
pub async fn checksum_file(kind: ChecksumKind, path: &Path) -> io::Result<String> {
	match kind {
		ChecksumKind::Md5 => digest_file::<Md5>(path).await,
		ChecksumKind::Sha1 => digest_file::<Sha1>(path).await,
		ChecksumKind::Sha256 => digest_file::<Sha256>(path).await,
	}
}

async fn digest_file<D: Digest + Send>(path: &Path) -> io::Result<String> {
	let mut file = File::open(path).await?;
	let mut hasher = D::new();
	let mut block = vec![0u8; CHECKSUM_BLOCK_SIZE];

	loop {
		let read = file.read(&mut block).await?;
		if read == 0 {
			break;
		}
		hasher.update(&block[..read]);
	}

	Ok(hex::encode_upper(hasher.finalize()))
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn digest_of(kind: ChecksumKind, content: &[u8]) -> String {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("file");
		tokio::fs::write(&path, content).await.unwrap();
		checksum_file(kind, &path).await.unwrap()
	}

	#[tokio::test]
	async fn known_digests() {
		assert_eq!(
			digest_of(ChecksumKind::Md5, b"abc").await,
			"900150983CD24FB0D6963F7D28E17F72"
		);
		assert_eq!(
			digest_of(ChecksumKind::Sha1, b"abc").await,
			"A9993E364706816ABA3E25717850C26C9CD0D89D"
		);
		assert_eq!(
			digest_of(ChecksumKind::Sha256, b"abc").await,
			"BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
		);
	}

	#[tokio::test]
	async fn identical_content_identical_digest() {
		let a = digest_of(ChecksumKind::Sha256, b"same bytes").await;
		let b = digest_of(ChecksumKind::Sha256, b"same bytes").await;
		let c = digest_of(ChecksumKind::Sha256, b"other bytes").await;
		assert_eq!(a, b);
		assert_ne!(a, c);
	}

	#[tokio::test]
	async fn large_file_is_streamed() {
		// Spans several read blocks; digest must match a one-shot hash.
		let content = vec![0xABu8; CHECKSUM_BLOCK_SIZE * 3 + 17];
		let streamed = digest_of(ChecksumKind::Sha256, &content).await;
		let oneshot = hex::encode_upper(Sha256::digest(&content));
		assert_eq!(streamed, oneshot);
	}

	#[test]
	fn parse_list_drops_unknown_names() {
		assert_eq!(
			ChecksumKind::parse_list("md5, sha256, not-a-hash"),
			vec![ChecksumKind::Md5, ChecksumKind::Sha256]
		);
		assert!(ChecksumKind::parse_list("").is_empty());
	}

	#[tokio::test]
	async fn unreadable_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("gone");
		assert!(checksum_file(ChecksumKind::Md5, &missing).await.is_err());
	}
}
