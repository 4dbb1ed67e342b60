//! FFmpeg CLI wrapper and media components for the vedit pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Duration and stream probing via FFprobe
//! - Structured edit operations (trim, speed, fade)
//! - Silence removal with a single trim/concat render
//! - Face-centred 9:16 auto-crop

pub mod command;
pub mod edit_ops;
pub mod error;
pub mod face_crop;
pub mod filters;
pub mod fs_utils;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod silence_removal;
#[cfg(all(test, unix))]
mod test_tools;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use edit_ops::apply_operations;
pub use error::{MediaError, MediaResult};
pub use face_crop::{auto_crop_face, compute_crop_rect, CropRect, FaceCropConfig, FaceSample};
pub use fs_utils::{copy_file, ArtifactSet};
pub use probe::{duration, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressReporter, ProgressSink, ProgressUpdate};
pub use silence_removal::{remove_silence, Interval, SilenceRemovalConfig};
