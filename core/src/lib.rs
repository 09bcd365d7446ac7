//! # ambry-core
//!
//! Indexing core for large, heterogeneous file collections: a
//! crawl-extract-index pipeline, a concurrent thumbnail engine and the task
//! manager that schedules both.
//!
//! The serving system around this crate (web front end, relational store,
//! text-search engine) is reached through the traits in [`storage`] and
//! [`index`]; bit-level format decoders live behind the capability traits in
//! [`parsing`] and the `ambry-media` crate.

pub mod config;
pub mod crawler;
pub mod document;
pub mod error;
pub mod index;
pub mod parsing;
pub mod storage;
pub mod task;
pub mod thumbnail;

pub use document::DocumentRecord;
pub use error::CoreError;
