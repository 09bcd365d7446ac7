//! In-memory reference implementation of [`Storage`].
//!
//! Reads go through an explicit generation-checked snapshot cache: every
//! mutation bumps the generation, every `directories()` call compares it
//! and rebuilds the snapshot only when stale.

use super::{Directory, Storage, StorageError, Task};
use async_trait::async_trait;
use chrono::Utc;
use std::{
	collections::{BTreeMap, HashMap},
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
};
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
struct State {
	directories: HashMap<i64, Directory>,
	tasks: BTreeMap<i64, Task>,
	next_directory_id: i64,
	next_option_id: i64,
	next_task_id: i64,
}

#[derive(Default)]
struct DirectoryCache {
	generation: u64,
	snapshot: Arc<HashMap<i64, Directory>>,
}

#[derive(Default)]
pub struct MemoryStore {
	state: RwLock<State>,
	generation: AtomicU64,
	cache: Mutex<DirectoryCache>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn bump(&self) {
		self.generation.fetch_add(1, Ordering::Release);
	}

	/// Drops a directory's stored options and reseeds the defaults.
	pub async fn reset_options(&self, directory_id: i64) -> Result<(), StorageError> {
		let mut state = self.state.write().await;
		let state = &mut *state;
		let directory = state
			.directories
			.get_mut(&directory_id)
			.ok_or(StorageError::DirectoryNotFound(directory_id))?;
		directory.set_default_options();

		for option in &mut directory.options {
			state.next_option_id += 1;
			option.id = state.next_option_id;
			option.directory_id = directory_id;
		}

		self.bump();
		Ok(())
	}

	/// Marks a task completed instead of deleting it, for callers that keep
	/// history.
	pub async fn complete_task(&self, task_id: i64) -> Result<(), StorageError> {
		let mut state = self.state.write().await;
		let task = state
			.tasks
			.get_mut(&task_id)
			.ok_or(StorageError::TaskNotFound(task_id))?;
		task.completed = true;
		task.completed_at = Some(Utc::now());
		drop(state);
		self.bump();
		Ok(())
	}
}

#[async_trait]
impl Storage for MemoryStore {
	async fn directories(&self) -> Result<HashMap<i64, Directory>, StorageError> {
		let generation = self.generation.load(Ordering::Acquire);

		let mut cache = self.cache.lock().await;
		if cache.generation != generation || cache.snapshot.is_empty() {
			let state = self.state.read().await;
			cache.snapshot = Arc::new(state.directories.clone());
			cache.generation = generation;
		}
		Ok(cache.snapshot.as_ref().clone())
	}

	async fn save_directory(&self, mut directory: Directory) -> Result<i64, StorageError> {
		let mut state = self.state.write().await;

		if state
			.directories
			.values()
			.any(|existing| existing.path == directory.path && existing.id != directory.id)
		{
			return Err(StorageError::DuplicateDirectoryPath(
				directory.path.display().to_string(),
			));
		}

		if directory.id == 0 {
			state.next_directory_id += 1;
			directory.id = state.next_directory_id;
		}
		let directory_id = directory.id;

		let next_option_id = &mut state.next_option_id;
		for option in &mut directory.options {
			if option.id == 0 {
				*next_option_id += 1;
				option.id = *next_option_id;
			}
			option.directory_id = directory_id;
		}

		state.directories.insert(directory_id, directory);
		drop(state);
		self.bump();
		Ok(directory_id)
	}

	async fn pending_tasks(&self) -> Result<Vec<Task>, StorageError> {
		let state = self.state.read().await;
		// BTreeMap iteration order is id order, which is creation order.
		Ok(state
			.tasks
			.values()
			.filter(|task| !task.completed)
			.cloned()
			.collect())
	}

	async fn save_task(&self, mut task: Task) -> Result<i64, StorageError> {
		let mut state = self.state.write().await;
		if task.id == 0 {
			state.next_task_id += 1;
			task.id = state.next_task_id;
		}
		let task_id = task.id;
		state.tasks.insert(task_id, task);
		drop(state);
		self.bump();
		Ok(task_id)
	}

	async fn delete_task(&self, task_id: i64) -> Result<(), StorageError> {
		let mut state = self.state.write().await;
		state
			.tasks
			.remove(&task_id)
			.ok_or(StorageError::TaskNotFound(task_id))?;
		drop(state);
		self.bump();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::TaskType;

	#[tokio::test]
	async fn duplicate_path_is_a_typed_conflict() {
		let store = MemoryStore::new();
		store
			.save_directory(Directory::new("/data/photos", "photos"))
			.await
			.unwrap();

		let err = store
			.save_directory(Directory::new("/data/photos", "photos again"))
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::DuplicateDirectoryPath(_)));
	}

	#[tokio::test]
	async fn snapshot_cache_tracks_mutations() {
		let store = MemoryStore::new();
		let id = store
			.save_directory(Directory::new("/data/a", "a"))
			.await
			.unwrap();
		assert_eq!(store.directories().await.unwrap().len(), 1);

		// A second read hits the cache; a mutation invalidates it.
		assert_eq!(store.directories().await.unwrap().len(), 1);
		let mut updated = store.directories().await.unwrap().remove(&id).unwrap();
		updated.name = "renamed".to_owned();
		store.save_directory(updated).await.unwrap();

		let dirs = store.directories().await.unwrap();
		assert_eq!(dirs[&id].name, "renamed");
	}

	#[tokio::test]
	async fn tasks_are_ordered_by_creation() {
		let store = MemoryStore::new();
		let first = store.save_task(Task::new(TaskType::Index, 1)).await.unwrap();
		let second = store
			.save_task(Task::new(TaskType::GenerateThumbnails, 1))
			.await
			.unwrap();
		assert!(first < second);

		let pending = store.pending_tasks().await.unwrap();
		assert_eq!(pending.len(), 2);
		assert_eq!(pending[0].id, first);

		store.delete_task(first).await.unwrap();
		assert_eq!(store.pending_tasks().await.unwrap()[0].id, second);
		assert!(matches!(
			store.delete_task(first).await,
			Err(StorageError::TaskNotFound(_))
		));
	}

	#[tokio::test]
	async fn reset_options_reseeds_defaults() {
		let store = MemoryStore::new();
		let mut directory = Directory::new("/data/b", "b");
		directory.set_option(crate::config::keys::THUMBNAIL_SIZE, "64");
		let id = store.save_directory(directory).await.unwrap();

		store.reset_options(id).await.unwrap();
		let dirs = store.directories().await.unwrap();
		assert_eq!(dirs[&id].option(crate::config::keys::THUMBNAIL_SIZE), "272");
	}
}
