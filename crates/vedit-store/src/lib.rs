//! Video metadata store.
//!
//! This crate provides:
//! - The [`MetadataStore`] interface the pipeline reports through
//! - A JSON-file implementation with atomic whole-record rewrites
//! - Per-record write serialization

pub mod error;
pub mod json_file;
pub mod metrics;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use json_file::JsonFileStore;
pub use store::{apply_progress, apply_status, clamp_percent, MetadataStore};
