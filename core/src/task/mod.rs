//! Task scheduling: one running task at a time, progress through shared
//! atomics, cooperative cancellation.

mod manager;

pub use manager::TaskManager;

use crate::storage::TaskType;
use serde::Serialize;
use std::sync::{
	atomic::{AtomicBool, AtomicU64, Ordering},
	Arc,
};

/// Live state of the task currently executing. Progress and cancellation are
/// plain atomics so the worker, the poll loop and status readers never
/// contend on a lock.
pub struct RunningTask {
	pub task_id: i64,
	pub task_type: TaskType,
	pub directory_id: i64,
	total: AtomicU64,
	processed: Arc<AtomicU64>,
	done: AtomicBool,
	cancelled: Arc<AtomicBool>,
}

impl RunningTask {
	pub fn new(task_id: i64, task_type: TaskType, directory_id: i64) -> Self {
		Self {
			task_id,
			task_type,
			directory_id,
			total: AtomicU64::new(0),
			processed: Arc::new(AtomicU64::new(0)),
			done: AtomicBool::new(false),
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Expected item count, estimated before the worker starts.
	pub fn set_total(&self, total: u64) {
		self.total.store(total, Ordering::Relaxed);
	}

	/// Counter handed to the worker; bumped once per item processed.
	pub fn processed_handle(&self) -> Arc<AtomicU64> {
		self.processed.clone()
	}

	/// Flag the worker polls between items.
	pub fn cancel_flag(&self) -> Arc<AtomicBool> {
		self.cancelled.clone()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}

	/// Set by the worker as its last action, cancelled or not.
	pub fn mark_done(&self) {
		self.done.store(true, Ordering::Release);
	}

	pub fn is_done(&self) -> bool {
		self.done.load(Ordering::Acquire)
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Relaxed)
	}

	pub fn snapshot(&self) -> TaskProgress {
		TaskProgress {
			task_id: self.task_id,
			task_type: self.task_type,
			directory_id: self.directory_id,
			total: self.total.load(Ordering::Relaxed),
			processed: self.processed.load(Ordering::Relaxed),
			done: self.is_done(),
			cancelled: self.is_cancelled(),
		}
	}
}

/// Point-in-time progress of the running task, shaped for status endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaskProgress {
	pub task_id: i64,
	pub task_type: TaskType,
	pub directory_id: i64,
	pub total: u64,
	pub processed: u64,
	pub done: bool,
	pub cancelled: bool,
}
