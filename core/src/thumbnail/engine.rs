//! Bounded-queue worker pool turning index entries into WebP thumbnails.
//!
//! One producer feeds a bounded channel; N workers pull from it. Every
//! failure is per-item: a corrupt image or a hung external tool costs one
//! thumbnail, never the pass. The progress counter is bumped exactly once
//! per item regardless of outcome.

use super::{ThumbnailError, ThumbnailSpec, ThumbnailStats};
use crate::{config, index::IndexSummary};
use ambry_media::{generate_thumbnail, FrameExtractor, VectorRasterizer};
use std::{
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, AtomicU64, Ordering},
		Arc,
	},
};
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

#[derive(Clone)]
pub struct ThumbnailEngine {
	spec: ThumbnailSpec,
	workers: usize,
	queue_capacity: usize,
	extractor: Arc<dyn FrameExtractor>,
	rasterizer: Arc<dyn VectorRasterizer>,
}

enum Outcome {
	Generated,
	Failed,
	Skipped,
}

impl ThumbnailEngine {
	pub fn new(
		spec: ThumbnailSpec,
		extractor: Arc<dyn FrameExtractor>,
		rasterizer: Arc<dyn VectorRasterizer>,
	) -> Self {
		Self {
			spec,
			workers: std::thread::available_parallelism().map_or(4, usize::from),
			queue_capacity: config::THUMBNAIL_QUEUE_CAPACITY,
			extractor,
			rasterizer,
		}
	}

	pub fn with_workers(mut self, workers: usize) -> Self {
		self.workers = workers.max(1);
		self
	}

	pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
		self.queue_capacity = capacity.max(1);
		self
	}

	/// Generates thumbnails for every request into `dest_dir`, named
	/// `<index id>.webp`. Returns once all workers have drained the queue
	/// and exited.
	pub async fn generate_all(
		&self,
		requests: Vec<IndexSummary>,
		source_root: &Path,
		dest_dir: &Path,
		processed: Arc<AtomicU64>,
		cancelled: Arc<AtomicBool>,
	) -> Result<ThumbnailStats, ThumbnailError> {
		tokio::fs::create_dir_all(dest_dir)
			.await
			.map_err(|source| ThumbnailError::CreateDir {
				path: dest_dir.to_path_buf(),
				source,
			})?;

		let (tx, rx) = async_channel::bounded::<IndexSummary>(self.queue_capacity);

		let mut workers = JoinSet::new();
		for _ in 0..self.workers {
			let engine = self.clone();
			let rx = rx.clone();
			let source_root = source_root.to_path_buf();
			let dest_dir = dest_dir.to_path_buf();
			let processed = processed.clone();

			workers.spawn(async move {
				let mut stats = ThumbnailStats::default();
				while let Ok(summary) = rx.recv().await {
					match engine.process_one(&summary, &source_root, &dest_dir).await {
						Outcome::Generated => stats.generated += 1,
						Outcome::Failed => stats.failed += 1,
						Outcome::Skipped => stats.skipped += 1,
					}
					processed.fetch_add(1, Ordering::Relaxed);
				}
				stats
			});
		}
		drop(rx);

		// Backpressure by retry: a full queue parks the producer without
		// dropping the item, and cancellation is still observed while parked.
		'feed: for summary in requests {
			let mut item = summary;
			loop {
				if cancelled.load(Ordering::Relaxed) {
					info!("thumbnail pass cancelled");
					break 'feed;
				}
				match tx.try_send(item) {
					Ok(()) => break,
					Err(async_channel::TrySendError::Full(back)) => {
						item = back;
						tokio::time::sleep(config::THUMBNAIL_ENQUEUE_RETRY).await;
					}
					Err(async_channel::TrySendError::Closed(_)) => break 'feed,
				}
			}
		}
		drop(tx);

		let mut total = ThumbnailStats::default();
		while let Some(joined) = workers.join_next().await {
			match joined {
				Ok(stats) => total += stats,
				Err(err) => warn!(%err, "thumbnail worker aborted"),
			}
		}

		info!(
			generated = total.generated,
			failed = total.failed,
			skipped = total.skipped,
			"thumbnail pass finished"
		);
		Ok(total)
	}

	async fn process_one(
		&self,
		summary: &IndexSummary,
		source_root: &Path,
		dest_dir: &Path,
	) -> Outcome {
		let source = join_rel(source_root, &summary.rel_path());
		let dest = dest_dir.join(format!("{}.webp", summary.id));

		let result = match summary.mime.as_deref() {
			Some("image/svg+xml") => match self.rasterizer.rasterize(&source).await {
				// The temp raster must outlive the blocking encode.
				Ok(raster) => self.encode(raster.path().to_path_buf(), dest).await,
				Err(err) => Err(err),
			},
			Some(mime) if mime.starts_with("image/") => self.encode(source.clone(), dest).await,
			Some(mime) if mime.starts_with("video/") => {
				match self.extractor.extract_frame(&source).await {
					Ok(frame) => self.encode(frame.path().to_path_buf(), dest).await,
					Err(err) => Err(err),
				}
			}
			_ => {
				trace!(path = %summary.rel_path(), "no thumbnail strategy for mime");
				return Outcome::Skipped;
			}
		};

		match result {
			Ok((width, height)) => {
				debug!(path = %summary.rel_path(), width, height, "thumbnail written");
				Outcome::Generated
			}
			Err(err) => {
				warn!(path = %summary.rel_path(), %err, "thumbnail failed");
				Outcome::Failed
			}
		}
	}

	/// Runs the CPU-bound decode/scale/encode on the blocking pool.
	async fn encode(
		&self,
		source: PathBuf,
		dest: PathBuf,
	) -> Result<(u32, u32), ambry_media::MediaError> {
		let params = self.spec.params();
		match tokio::task::spawn_blocking(move || generate_thumbnail(&source, &dest, &params))
			.await
		{
			Ok(result) => result,
			Err(err) => Err(ambry_media::MediaError::Encode(format!(
				"encode task aborted: {err}"
			))),
		}
	}
}

/// Joins a `/`-separated index path onto a filesystem root.
fn join_rel(root: &Path, rel: &str) -> PathBuf {
	rel.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::document::index_id;
	use ambry_media::MediaError;
	use async_trait::async_trait;
	use tempfile::NamedTempFile;

	struct NullExtractor;

	#[async_trait]
	impl FrameExtractor for NullExtractor {
		async fn extract_frame(&self, _source: &Path) -> Result<NamedTempFile, MediaError> {
			Err(MediaError::Encode("no frames in tests".to_owned()))
		}
	}

	struct NullRasterizer;

	#[async_trait]
	impl VectorRasterizer for NullRasterizer {
		async fn rasterize(&self, _source: &Path) -> Result<NamedTempFile, MediaError> {
			Err(MediaError::Encode("no rasters in tests".to_owned()))
		}
	}

	fn engine() -> ThumbnailEngine {
		ThumbnailEngine::new(
			ThumbnailSpec::default(),
			Arc::new(NullExtractor),
			Arc::new(NullRasterizer),
		)
		.with_workers(3)
		.with_queue_capacity(2)
	}

	fn summary(directory_id: i64, name: &str, ext: &str, mime: &str) -> IndexSummary {
		IndexSummary {
			id: index_id(directory_id, "", &format!("{name}.{ext}")),
			directory_id,
			path: String::new(),
			name: name.to_owned(),
			extension: Some(ext.to_owned()),
			mime: Some(mime.to_owned()),
		}
	}

	#[tokio::test]
	async fn missing_source_costs_one_thumbnail_not_the_pass() {
		let sources = tempfile::tempdir().unwrap();
		let thumbs = tempfile::tempdir().unwrap();

		let mut requests = Vec::new();
		for name in ["a", "b", "c", "d", "e"] {
			image::RgbImage::new(40, 30)
				.save(sources.path().join(format!("{name}.png")))
				.unwrap();
			requests.push(summary(1, name, "png", "image/png"));
		}
		// Listed in the index but gone from disk.
		requests.push(summary(1, "ghost", "png", "image/png"));

		let processed = Arc::new(AtomicU64::new(0));
		let cancelled = Arc::new(AtomicBool::new(false));
		let stats = engine()
			.generate_all(
				requests.clone(),
				sources.path(),
				thumbs.path(),
				processed.clone(),
				cancelled,
			)
			.await
			.unwrap();

		assert_eq!(stats.generated, 5);
		assert_eq!(stats.failed, 1);
		assert_eq!(processed.load(Ordering::Relaxed), 6);

		for request in &requests[..5] {
			let thumb = thumbs.path().join(format!("{}.webp", request.id));
			assert!(thumb.exists(), "missing {}", thumb.display());
		}
		assert!(!thumbs
			.path()
			.join(format!("{}.webp", requests[5].id))
			.exists());
	}

	#[tokio::test]
	async fn mimes_without_a_strategy_are_skipped() {
		let sources = tempfile::tempdir().unwrap();
		let thumbs = tempfile::tempdir().unwrap();
		tokio::fs::write(sources.path().join("notes.txt"), b"text")
			.await
			.unwrap();

		let processed = Arc::new(AtomicU64::new(0));
		let cancelled = Arc::new(AtomicBool::new(false));
		let stats = engine()
			.generate_all(
				vec![summary(1, "notes", "txt", "text/plain")],
				sources.path(),
				thumbs.path(),
				processed.clone(),
				cancelled,
			)
			.await
			.unwrap();

		assert_eq!(stats.skipped, 1);
		assert_eq!(stats.generated + stats.failed, 0);
		assert_eq!(processed.load(Ordering::Relaxed), 1);
	}

	#[tokio::test]
	async fn cancellation_stops_feeding_the_queue() {
		let sources = tempfile::tempdir().unwrap();
		let thumbs = tempfile::tempdir().unwrap();

		let requests = vec![summary(1, "a", "png", "image/png"); 50];
		let processed = Arc::new(AtomicU64::new(0));
		let cancelled = Arc::new(AtomicBool::new(true));

		let stats = engine()
			.generate_all(requests, sources.path(), thumbs.path(), processed, cancelled)
			.await
			.unwrap();

		assert_eq!(stats.generated + stats.failed + stats.skipped, 0);
	}

	#[test]
	fn rel_paths_become_nested_filesystem_paths() {
		let joined = join_rel(Path::new("/data"), "music/albums/track.flac");
		assert_eq!(joined, Path::new("/data/music/albums/track.flac"));
	}
}
