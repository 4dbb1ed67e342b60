//! Silence removal using FFmpeg's `silencedetect` filter.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Input video  │───►│silencedetect │───►│ complement   │
//! │              │    │ (silent ivs) │    │ (audible ivs)│
//! └──────────────┘    └──────────────┘    └──────────────┘
//!                                                │
//!                                                ▼
//!                     ┌──────────────┐    ┌──────────────┐
//!                     │ Output video │◄───│ trim/atrim + │
//!                     │              │    │ concat graph │
//!                     └──────────────┘    └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use vedit_media::silence_removal::{remove_silence, SilenceRemovalConfig};
//!
//! let config = SilenceRemovalConfig::default();
//! remove_silence(&input, &output, &config, &runner, &progress).await?;
//! ```

mod apply;
mod config;
mod detect;
mod intervals;

pub use apply::{remove_silence, MIN_SEGMENT_SECS};
pub use config::SilenceRemovalConfig;
pub use detect::{detect_silence, parse_silence_markers};
pub use intervals::{complement, total_duration, Interval};
