//! Shared data models for the vedit pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video records as persisted by the metadata store
//! - Requested processing options
//! - Discrete edit operations produced by the edit-instruction parser

pub mod edit;
pub mod video;

// Re-export common types
pub use edit::EditOperation;
pub use video::{ProcessingDetails, ProcessingOptions, VideoId, VideoRecord, VideoStatus};
