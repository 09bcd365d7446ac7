//! Filesystem walk feeding the index in batches.
//!
//! The walk is iterative, follows symlinks with a cycle guard, and treats a
//! vanished file as routine. Per-file failures never abort the crawl; only
//! an unreadable root or a refused index batch do.

use crate::{
	document::DocumentRecord,
	index::{IndexClient, IndexError},
	parsing::{mime::MimeGuesser, ParserRegistry},
	storage::Directory,
};
use std::{
	io,
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, AtomicU64, Ordering},
		Arc,
	},
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Error)]
pub enum CrawlError {
	#[error("cannot read crawl root {path}: {source}")]
	UnreadableRoot {
		path: PathBuf,
		source: io::Error,
	},

	#[error(transparent)]
	Index(#[from] IndexError),

	#[error("i/o error: {0}")]
	Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
	/// Files encountered, whether or not they produced a record.
	pub seen: u64,
	/// Records handed to the indexer.
	pub indexed: u64,
	/// Files skipped after a parse failure or vanish.
	pub skipped: u64,
	/// Batches flushed, counting the final partial one.
	pub batches: u64,
}

/// Tracks directories already entered so symlinked cycles terminate.
#[derive(Default)]
struct VisitedDirs {
	#[cfg(unix)]
	seen: std::collections::HashSet<(u64, u64)>,
	#[cfg(not(unix))]
	seen: std::collections::HashSet<PathBuf>,
}

impl VisitedDirs {
	/// Returns false when the directory was visited before.
	async fn enter(&mut self, path: &Path, metadata: &std::fs::Metadata) -> bool {
		#[cfg(unix)]
		{
			use std::os::unix::fs::MetadataExt;
			let _ = path;
			self.seen.insert((metadata.dev(), metadata.ino()))
		}
		#[cfg(not(unix))]
		{
			let _ = metadata;
			match fs::canonicalize(path).await {
				Ok(canonical) => self.seen.insert(canonical),
				Err(_) => false,
			}
		}
	}
}

pub struct Crawler {
	registry: ParserRegistry,
	guesser: MimeGuesser,
	index: Arc<dyn IndexClient>,
	batch_size: usize,
}

impl Crawler {
	pub fn new(
		registry: ParserRegistry,
		guesser: MimeGuesser,
		index: Arc<dyn IndexClient>,
		batch_size: usize,
	) -> Self {
		Self {
			registry,
			guesser,
			index,
			batch_size,
		}
	}

	/// Walks the directory's root, parses every file and flushes records to
	/// the index in batches. `processed` is bumped per file before parsing so
	/// progress reflects files touched, not files that survived. Setting
	/// `cancelled` stops the walk at the next file; records already parsed
	/// are still flushed.
	pub async fn crawl(
		&self,
		directory: &Directory,
		processed: Arc<AtomicU64>,
		cancelled: Arc<AtomicBool>,
	) -> Result<CrawlStats, CrawlError> {
		let root = directory.path.as_path();
		let root_meta = fs::metadata(root)
			.await
			.map_err(|source| CrawlError::UnreadableRoot {
				path: root.to_path_buf(),
				source,
			})?;

		let mut visited = VisitedDirs::default();
		visited.enter(root, &root_meta).await;

		let mut stats = CrawlStats::default();
		let mut batch: Vec<DocumentRecord> = Vec::with_capacity(self.batch_size.min(1024));
		let mut stack = vec![root.to_path_buf()];
		let mut is_root = true;

		'walk: while let Some(dir) = stack.pop() {
			let mut entries = match fs::read_dir(&dir).await {
				Ok(entries) => entries,
				Err(source) if is_root => {
					return Err(CrawlError::UnreadableRoot {
						path: dir,
						source,
					})
				}
				Err(err) => {
					warn!(path = %dir.display(), %err, "skipping unreadable directory");
					continue;
				}
			};
			is_root = false;

			while let Some(entry) = entries.next_entry().await? {
				if cancelled.load(Ordering::Relaxed) {
					info!(directory_id = directory.id, "crawl cancelled");
					break 'walk;
				}

				let path = entry.path();
				// One metadata call per entry, following symlinks. A file
				// deleted between listing and stat is routine.
				let metadata = match fs::metadata(&path).await {
					Ok(metadata) => metadata,
					Err(err) if err.kind() == io::ErrorKind::NotFound => {
						trace!(path = %path.display(), "vanished before stat");
						continue;
					}
					Err(err) => {
						warn!(path = %path.display(), %err, "skipping unstatable entry");
						continue;
					}
				};

				if metadata.is_dir() {
					if visited.enter(&path, &metadata).await {
						stack.push(path);
					} else {
						debug!(path = %path.display(), "directory already visited");
					}
					continue;
				}
				if !metadata.is_file() {
					continue;
				}

				stats.seen += 1;
				processed.fetch_add(1, Ordering::Relaxed);

				let mime = self.guesser.guess(&path).await;
				let parser = self.registry.resolve(mime.as_deref());
				match parser.parse(root, &path, mime.as_deref()).await {
					Ok(record) => {
						batch.push(record);
						stats.indexed += 1;
					}
					Err(err) if err.is_vanished() => {
						trace!(path = %path.display(), "vanished during parse");
						stats.skipped += 1;
					}
					Err(err) => {
						warn!(
							path = %path.display(),
							parser = parser.name(),
							%err,
							"parse failed, skipping file"
						);
						stats.skipped += 1;
					}
				}

				if batch.len() >= self.batch_size {
					self.flush(&mut batch, directory.id, &mut stats).await?;
				}
			}
		}

		if !batch.is_empty() {
			self.flush(&mut batch, directory.id, &mut stats).await?;
		}

		info!(
			directory_id = directory.id,
			seen = stats.seen,
			indexed = stats.indexed,
			skipped = stats.skipped,
			batches = stats.batches,
			"crawl finished"
		);
		Ok(stats)
	}

	async fn flush(
		&self,
		batch: &mut Vec<DocumentRecord>,
		directory_id: i64,
		stats: &mut CrawlStats,
	) -> Result<(), CrawlError> {
		let records = std::mem::take(batch);
		debug!(directory_id, count = records.len(), "flushing batch");
		self.index.submit_batch(records, directory_id).await?;
		stats.batches += 1;
		Ok(())
	}
}

/// Counts regular files under `root` with the same walk rules as the crawl,
/// for sizing progress before work starts.
pub async fn count_files(root: &Path) -> Result<u64, CrawlError> {
	let root_meta = fs::metadata(root)
		.await
		.map_err(|source| CrawlError::UnreadableRoot {
			path: root.to_path_buf(),
			source,
		})?;

	let mut visited = VisitedDirs::default();
	visited.enter(root, &root_meta).await;

	let mut count = 0u64;
	let mut stack = vec![root.to_path_buf()];

	while let Some(dir) = stack.pop() {
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(_) => continue,
		};
		while let Some(entry) = entries.next_entry().await? {
			let path = entry.path();
			let Ok(metadata) = fs::metadata(&path).await else {
				continue;
			};
			if metadata.is_dir() {
				if visited.enter(&path, &metadata).await {
					stack.push(path);
				}
			} else if metadata.is_file() {
				count += 1;
			}
		}
	}

	Ok(count)
}
