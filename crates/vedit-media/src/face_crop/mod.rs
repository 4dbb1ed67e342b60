//! Talking-head auto-crop to 9:16.
//!
//! A fixed number of frames is sampled across the video, the most confident
//! face in each is located, and one crop rectangle is centred on the average
//! of those positions. The rectangle is static for the whole output.
//!
//! Detection uses YuNet through OpenCV when the `opencv` feature is enabled
//! and a model is available; otherwise the crop falls back to the frame
//! centre.

mod config;
mod crop_rect;
mod sampling;
#[cfg(feature = "opencv")]
mod yunet;

pub use config::FaceCropConfig;
pub use crop_rect::{average_center, compute_crop_rect, CropRect, FaceSample};
pub use sampling::{
    find_model_path, sample_indices, sample_positions, sample_video_faces, FaceDetection,
    FaceModel, FrameSource, YUNET_MODEL_PATHS,
};
#[cfg(feature = "opencv")]
pub use yunet::{VideoCaptureSource, YuNetModel};

use std::path::Path;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe;
use crate::progress::ProgressReporter;

/// Crop `input` to a 9:16 region following the speaker's face.
pub async fn auto_crop_face(
    input: &Path,
    output: &Path,
    config: &FaceCropConfig,
    runner: &FfmpegRunner,
    progress: &ProgressReporter,
) -> MediaResult<()> {
    progress.report(5.0);

    let info = probe::probe_video(input).await.map_err(|e| match e {
        MediaError::Probe { .. } | MediaError::JsonParse(_) => {
            warn!(path = %input.display(), "Cannot read source video: {}", e);
            MediaError::SourceUnreadable(input.to_path_buf())
        }
        other => other,
    })?;
    info!("Input video dimensions: {}x{}", info.width, info.height);
    progress.report(10.0);

    let samples = sample_video_faces(input, config).await?;
    progress.report(50.0);
    if samples.is_empty() {
        warn!("No faces detected, using center crop");
    }

    let rect = compute_crop_rect(&samples, info.width, info.height)?;
    info!(
        "Crop region: x={}, y={}, w={}, h={}",
        rect.x, rect.y, rect.width, rect.height
    );
    progress.report(60.0);

    let cmd = FfmpegCommand::new(input, output)
        .video_filter(rect.to_filter())
        .audio_codec("copy");

    let duration = info.duration;
    let reporter = progress.clone();
    runner
        .run_with_progress(&cmd, move |p| {
            reporter.report_between(60.0, 100.0, p.fraction(duration));
        })
        .await
        .map_err(MediaError::into_crop_failure)?;

    progress.report(100.0);
    info!("Face auto-crop complete: {}x{} output", rect.width, rect.height);
    Ok(())
}
