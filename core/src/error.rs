use thiserror::Error;

/// Top-level error for task execution. Only configuration and environment
/// problems surface here; per-file trouble is handled where it happens.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error(transparent)]
	Storage(#[from] crate::storage::StorageError),

	#[error(transparent)]
	Registry(#[from] crate::parsing::RegistryError),

	#[error(transparent)]
	Crawl(#[from] crate::crawler::CrawlError),

	#[error(transparent)]
	Index(#[from] crate::index::IndexError),

	#[error(transparent)]
	Thumbnail(#[from] crate::thumbnail::ThumbnailError),

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),
}
