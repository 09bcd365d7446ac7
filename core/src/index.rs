//! The search-index boundary: batched writes in, lightweight summaries out.
//!
//! The engine behind the trait is interchangeable; [`MemoryIndex`] backs the
//! tests and small deployments, a text-search server implements the same
//! trait in production.

use crate::document::{index_id, DocumentRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Mutex};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IndexError {
	/// The engine refused the payload. Not retryable.
	#[error("index rejected batch: {0}")]
	Rejected(String),

	/// The engine is unreachable. The task fails and can be re-run.
	#[error("index unavailable: {0}")]
	Unavailable(String),
}

/// What a thumbnail pass needs to know about an indexed file: identity,
/// location and mime, nothing heavier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummary {
	pub id: Uuid,
	pub directory_id: i64,
	pub path: String,
	pub name: String,
	pub extension: Option<String>,
	pub mime: Option<String>,
}

impl IndexSummary {
	pub fn file_name(&self) -> String {
		match &self.extension {
			Some(ext) if !ext.is_empty() => format!("{}.{}", self.name, ext),
			_ => self.name.clone(),
		}
	}

	/// Location relative to the crawl root.
	pub fn rel_path(&self) -> String {
		if self.path.is_empty() {
			self.file_name()
		} else {
			format!("{}/{}", self.path, self.file_name())
		}
	}
}

#[async_trait]
pub trait IndexClient: Send + Sync {
	/// Writes one batch. Records are keyed by their deterministic id, so
	/// re-submitting a file overwrites rather than duplicates.
	async fn submit_batch(
		&self,
		records: Vec<DocumentRecord>,
		directory_id: i64,
	) -> Result<(), IndexError>;

	/// Streams back every record belonging to one directory.
	async fn scan_all(&self, directory_id: i64) -> Result<Vec<IndexSummary>, IndexError>;

	async fn delete_by_directory(&self, directory_id: i64) -> Result<(), IndexError>;
}

#[derive(Default)]
struct MemoryIndexState {
	records: HashMap<Uuid, (i64, DocumentRecord)>,
	batch_sizes: Vec<usize>,
}

/// In-process index used by tests and single-machine setups.
#[derive(Default)]
pub struct MemoryIndex {
	state: Mutex<MemoryIndexState>,
}

impl MemoryIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sizes of every batch submitted so far, in order.
	pub fn batch_sizes(&self) -> Vec<usize> {
		self.state.lock().unwrap_or_else(|e| e.into_inner()).batch_sizes.clone()
	}

	pub fn len(&self) -> usize {
		self.state.lock().unwrap_or_else(|e| e.into_inner()).records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, id: &Uuid) -> Option<DocumentRecord> {
		self.state
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.records
			.get(id)
			.map(|(_, record)| record.clone())
	}
}

#[async_trait]
impl IndexClient for MemoryIndex {
	async fn submit_batch(
		&self,
		records: Vec<DocumentRecord>,
		directory_id: i64,
	) -> Result<(), IndexError> {
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		state.batch_sizes.push(records.len());
		for record in records {
			let id = record.index_id(directory_id);
			state.records.insert(id, (directory_id, record));
		}
		Ok(())
	}

	async fn scan_all(&self, directory_id: i64) -> Result<Vec<IndexSummary>, IndexError> {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		let mut summaries: Vec<IndexSummary> = state
			.records
			.iter()
			.filter(|(_, (owner, _))| *owner == directory_id)
			.map(|(id, (_, record))| IndexSummary {
				id: *id,
				directory_id,
				path: record.path.clone(),
				name: record.name.clone(),
				extension: record.extension.clone(),
				mime: record.mime.clone(),
			})
			.collect();
		summaries.sort_by(|a, b| a.rel_path().cmp(&b.rel_path()));
		Ok(summaries)
	}

	async fn delete_by_directory(&self, directory_id: i64) -> Result<(), IndexError> {
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		state.records.retain(|_, (owner, _)| *owner != directory_id);
		Ok(())
	}
}

/// Recomputes the id a summary was stored under, for verification.
pub fn summary_id(summary: &IndexSummary) -> Uuid {
	index_id(summary.directory_id, &summary.path, &summary.file_name())
}
