//! Snapshot types for the external relational store and the trait the core
//! reaches it through.
//!
//! Directories, options and tasks are owned and mutated elsewhere; the core
//! re-fetches read-only snapshots at task start and never writes them
//! mid-task.

mod memory;

pub use memory::MemoryStore;

use crate::config;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};
use thiserror::Error;

/// One crawl root with its per-directory options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
	pub id: i64,
	/// Absolute root path, unique across the store.
	pub path: PathBuf,
	pub enabled: bool,
	pub name: String,
	pub options: Vec<DirOption>,
}

impl Directory {
	pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
		let mut directory = Self {
			id: 0,
			path: path.into(),
			enabled: true,
			name: name.into(),
			options: Vec::new(),
		};
		directory.set_default_options();
		directory
	}

	/// Seeds the static defaults table, replacing any existing options.
	pub fn set_default_options(&mut self) {
		self.options = config::DEFAULT_OPTIONS
			.iter()
			.map(|(key, value)| DirOption {
				id: 0,
				key: (*key).to_owned(),
				value: (*value).to_owned(),
				directory_id: self.id,
			})
			.collect();
	}

	/// Option value with fallback to the seeded default, then `""`.
	pub fn option(&self, key: &str) -> &str {
		self.options
			.iter()
			.find(|opt| opt.key == key)
			.map(|opt| opt.value.as_str())
			.or_else(|| config::default_option(key))
			.unwrap_or("")
	}

	pub fn set_option(&mut self, key: &str, value: &str) {
		match self.options.iter_mut().find(|opt| opt.key == key) {
			Some(opt) => opt.value = value.to_owned(),
			None => self.options.push(DirOption {
				id: 0,
				key: key.to_owned(),
				value: value.to_owned(),
				directory_id: self.id,
			}),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirOption {
	pub id: i64,
	pub key: String,
	pub value: String,
	pub directory_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
	Index,
	GenerateThumbnails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
	pub id: i64,
	pub task_type: TaskType,
	pub directory_id: i64,
	pub completed: bool,
	pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
	pub fn new(task_type: TaskType, directory_id: i64) -> Self {
		Self {
			id: 0,
			task_type,
			directory_id,
			completed: false,
			completed_at: None,
		}
	}
}

#[derive(Debug, Error)]
pub enum StorageError {
	/// Unique-key conflict, surfaced as a typed error instead of a silent
	/// overwrite.
	#[error("duplicate directory path: {0}")]
	DuplicateDirectoryPath(String),

	#[error("directory {0} not found")]
	DirectoryNotFound(i64),

	#[error("task {0} not found")]
	TaskNotFound(i64),
}

/// Interface to the external store. Implementations must keep
/// `pending_tasks` ordered by creation.
#[async_trait]
pub trait Storage: Send + Sync {
	async fn directories(&self) -> Result<HashMap<i64, Directory>, StorageError>;

	async fn save_directory(&self, directory: Directory) -> Result<i64, StorageError>;

	/// Incomplete tasks in creation order.
	async fn pending_tasks(&self) -> Result<Vec<Task>, StorageError>;

	async fn save_task(&self, task: Task) -> Result<i64, StorageError>;

	async fn delete_task(&self, task_id: i64) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn option_lookup_falls_back_to_defaults() {
		let mut directory = Directory::new("/data", "data");
		assert_eq!(directory.option(config::keys::THUMBNAIL_SIZE), "272");

		directory.set_option(config::keys::THUMBNAIL_SIZE, "128");
		assert_eq!(directory.option(config::keys::THUMBNAIL_SIZE), "128");

		directory.options.clear();
		// No stored options at all: still answers from the defaults table.
		assert_eq!(directory.option(config::keys::THUMBNAIL_QUALITY), "85");
		assert_eq!(directory.option("UnknownKey"), "");
	}
}
