//! The poll loop that drains the task queue, one task at a time.
//!
//! Every poll the manager either retires a finished task or starts the
//! oldest pending one. Workers run as joinable tasks and report through the
//! [`RunningTask`] atomics; a task that fails to start is retired with an
//! error so it cannot wedge the queue.

use super::RunningTask;
use crate::{
	config,
	crawler::{count_files, Crawler},
	error::CoreError,
	index::IndexClient,
	parsing::{self, ContentExtractor, MimeGuesser, NoopExtractor},
	storage::{Storage, StorageError, Task, TaskType},
	thumbnail::{namespace_dir, ThumbnailEngine, ThumbnailSpec},
};
use ambry_media::{
	CommandRasterizer, FfmpegFrameExtractor, FfprobeProbe, FrameExtractor, MediaProbe,
	VectorRasterizer,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{error, info, warn};

struct CurrentTask {
	running: Arc<RunningTask>,
	worker: JoinHandle<()>,
}

pub struct TaskManager {
	storage: Arc<dyn Storage>,
	index: Arc<dyn IndexClient>,
	probe: Arc<dyn MediaProbe>,
	content: Arc<dyn ContentExtractor>,
	frames: Arc<dyn FrameExtractor>,
	rasterizer: Arc<dyn VectorRasterizer>,
	thumbnail_root: PathBuf,
	poll_interval: Duration,
	batch_size: usize,
	current: Mutex<Option<CurrentTask>>,
}

impl TaskManager {
	/// External tool bindings default to the standard binaries on `PATH`;
	/// the `with_*` setters swap them out.
	pub fn new(
		storage: Arc<dyn Storage>,
		index: Arc<dyn IndexClient>,
		thumbnail_root: impl Into<PathBuf>,
	) -> Self {
		Self {
			storage,
			index,
			probe: Arc::new(FfprobeProbe::default()),
			content: Arc::new(NoopExtractor),
			frames: Arc::new(FfmpegFrameExtractor::default()),
			rasterizer: Arc::new(CommandRasterizer::default()),
			thumbnail_root: thumbnail_root.into(),
			poll_interval: config::TASK_POLL_INTERVAL,
			batch_size: config::INDEX_BATCH_SIZE,
			current: Mutex::new(None),
		}
	}

	pub fn with_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
		self.probe = probe;
		self
	}

	pub fn with_content_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
		self.content = extractor;
		self
	}

	pub fn with_frame_extractor(mut self, frames: Arc<dyn FrameExtractor>) -> Self {
		self.frames = frames;
		self
	}

	pub fn with_rasterizer(mut self, rasterizer: Arc<dyn VectorRasterizer>) -> Self {
		self.rasterizer = rasterizer;
		self
	}

	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	pub fn with_batch_size(mut self, batch_size: usize) -> Self {
		self.batch_size = batch_size.max(1);
		self
	}

	/// Queues a task for the poll loop to pick up.
	pub async fn enqueue(
		&self,
		task_type: TaskType,
		directory_id: i64,
	) -> Result<i64, StorageError> {
		self.storage.save_task(Task::new(task_type, directory_id)).await
	}

	/// Runs the poll loop until the handle is aborted.
	pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(self.poll_interval);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				self.poll_once().await;
			}
		})
	}

	/// One scheduling step: retire the running task when its worker has
	/// finished, otherwise start the oldest pending task if none is running.
	pub async fn poll_once(&self) {
		let mut current = self.current.lock().await;

		if let Some(active) = current.as_mut() {
			// A cancelled worker gets until the next poll to stop on its own;
			// after that it is forcibly terminated.
			if !active.running.is_done() && !active.running.is_cancelled() {
				return;
			}
			let finished = current.take();
			drop(current);
			if let Some(finished) = finished {
				self.retire(finished).await;
			}
			return;
		}

		let pending = match self.storage.pending_tasks().await {
			Ok(pending) => pending,
			Err(err) => {
				error!(%err, "cannot list pending tasks");
				return;
			}
		};
		let Some(task) = pending.into_iter().next() else {
			return;
		};

		match self.start(&task).await {
			Ok(started) => {
				info!(
					task_id = task.id,
					task_type = ?task.task_type,
					directory_id = task.directory_id,
					"task started"
				);
				*current = Some(started);
			}
			Err(err) => {
				error!(task_id = task.id, %err, "task failed to start, retiring it");
				if let Err(err) = self.storage.delete_task(task.id).await {
					warn!(task_id = task.id, %err, "cannot retire task");
				}
			}
		}
	}

	async fn retire(&self, finished: CurrentTask) {
		let task_id = finished.running.task_id;
		if !finished.running.is_done() {
			finished.worker.abort();
		}
		match finished.worker.await {
			Ok(()) => {}
			Err(err) if err.is_cancelled() => {
				info!(task_id, "cancelled worker terminated")
			}
			Err(err) => error!(task_id, %err, "task worker panicked"),
		}
		if let Err(err) = self.storage.delete_task(task_id).await {
			warn!(task_id, %err, "cannot delete finished task");
		}
		info!(task_id, "task finished");
	}

	async fn start(&self, task: &Task) -> Result<CurrentTask, CoreError> {
		let directories = self.storage.directories().await?;
		let directory = directories
			.get(&task.directory_id)
			.ok_or(StorageError::DirectoryNotFound(task.directory_id))?
			.clone();

		let running = Arc::new(RunningTask::new(task.id, task.task_type, task.directory_id));
		let processed = running.processed_handle();
		let cancelled = running.cancel_flag();

		let worker = match task.task_type {
			TaskType::Index => {
				let registry = parsing::build_registry(
					&directory,
					self.probe.clone(),
					self.content.clone(),
				)?;
				running.set_total(count_files(&directory.path).await?);

				let guesser =
					MimeGuesser::from_option(directory.option(config::keys::MIME_GUESSER));
				let crawler =
					Crawler::new(registry, guesser, self.index.clone(), self.batch_size);
				let running = running.clone();
				tokio::spawn(async move {
					if let Err(err) = crawler.crawl(&directory, processed, cancelled).await {
						error!(directory_id = directory.id, %err, "index task failed");
					}
					running.mark_done();
				})
			}
			TaskType::GenerateThumbnails => {
				let summaries = self.index.scan_all(directory.id).await?;
				running.set_total(summaries.len() as u64);

				let engine = ThumbnailEngine::new(
					ThumbnailSpec::from_directory(&directory),
					self.frames.clone(),
					self.rasterizer.clone(),
				);
				let dest = namespace_dir(&self.thumbnail_root, directory.id);
				let running = running.clone();
				tokio::spawn(async move {
					let result = engine
						.generate_all(summaries, &directory.path, &dest, processed, cancelled)
						.await;
					if let Err(err) = result {
						error!(directory_id = directory.id, %err, "thumbnail task failed");
					}
					running.mark_done();
				})
			}
		};

		Ok(CurrentTask { running, worker })
	}

	/// Requests cancellation of the running task. The worker stops at its
	/// next item; retirement happens on a later poll.
	pub async fn cancel(&self) {
		let current = self.current.lock().await;
		if let Some(active) = current.as_ref() {
			info!(task_id = active.running.task_id, "cancelling running task");
			active.running.cancel();
		}
	}

	/// Progress of the running task, if any.
	pub async fn current_progress(&self) -> Option<super::TaskProgress> {
		let current = self.current.lock().await;
		current.as_ref().map(|active| active.running.snapshot())
	}
}
