//! Face position sampling over evenly spaced frames.
//!
//! Decoding and detection sit behind [`FrameSource`] and [`FaceModel`] so the
//! sampling rules can run against anything that yields frames.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::config::FaceCropConfig;
use super::crop_rect::FaceSample;
use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// One face found in a frame, in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    /// Left edge (0.0-1.0)
    pub x: f64,
    /// Top edge (0.0-1.0)
    pub y: f64,
    /// Width (0.0-1.0)
    pub width: f64,
    /// Height (0.0-1.0)
    pub height: f64,
    /// Detector confidence (0.0-1.0)
    pub confidence: f64,
}

impl FaceDetection {
    /// Box centre, clamped into the frame.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x + self.width / 2.0).clamp(0.0, 1.0),
            (self.y + self.height / 2.0).clamp(0.0, 1.0),
        )
    }
}

/// Random-access frame decoder.
pub trait FrameSource {
    type Frame;

    /// Total frames reported by the container; zero or less when unknown.
    fn frame_count(&mut self) -> i64;

    /// Seek to `index` and decode one frame. `Ok(None)` when nothing decodes.
    fn read_frame(&mut self, index: i64) -> MediaResult<Option<Self::Frame>>;
}

/// Single-frame face detector.
pub trait FaceModel<F> {
    fn detect(&mut self, frame: &F) -> MediaResult<Vec<FaceDetection>>;
}

/// `min(count, total)` frame indices spread evenly over `[0, total - 1]`.
pub fn sample_indices(total: i64, count: usize) -> Vec<i64> {
    if total <= 0 || count == 0 {
        return Vec::new();
    }

    let k = (count as i64).min(total);
    if k == 1 {
        return vec![0];
    }

    (0..k).map(|i| i * (total - 1) / (k - 1)).collect()
}

/// Highest-confidence detection, if any.
fn best_detection(detections: &[FaceDetection]) -> Option<&FaceDetection> {
    detections
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

/// Sample face centres from `source` using `model`.
///
/// Frames that fail to decode, fail detection, or contain no face are left
/// out; the result may be empty.
pub fn sample_positions<S, M>(source: &mut S, model: &mut M, sample_count: usize) -> Vec<FaceSample>
where
    S: FrameSource,
    M: FaceModel<S::Frame>,
{
    let total = source.frame_count();
    let indices = sample_indices(total, sample_count);
    let mut samples = Vec::with_capacity(indices.len());

    for &index in &indices {
        let frame = match source.read_frame(index) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(frame = index, "No frame decoded");
                metrics::record_face_sample("skipped");
                continue;
            }
            Err(e) => {
                debug!(frame = index, "Frame decode failed: {}", e);
                metrics::record_face_sample("skipped");
                continue;
            }
        };

        let detections = match model.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                debug!(frame = index, "Face detection failed: {}", e);
                metrics::record_face_sample("skipped");
                continue;
            }
        };

        let Some(best) = best_detection(&detections) else {
            metrics::record_face_sample("none");
            continue;
        };

        let (cx, cy) = best.center();
        samples.push(FaceSample {
            cx,
            cy,
            width: best.width,
            height: best.height,
        });
        metrics::record_face_sample("face");
    }

    info!(
        "Detected faces in {} / {} sampled frames",
        samples.len(),
        indices.len()
    );
    samples
}

/// Sample face centres from the video at `input` on a blocking thread.
///
/// Yields no samples (a centre crop) when face detection is unavailable.
pub async fn sample_video_faces(input: &Path, config: &FaceCropConfig) -> MediaResult<Vec<FaceSample>> {
    let input = input.to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || sample_file(&input, &config))
        .await
        .map_err(|e| MediaError::detection_failed(format!("Face sampling task failed: {}", e)))
}

#[cfg(feature = "opencv")]
fn sample_file(input: &Path, config: &FaceCropConfig) -> Vec<FaceSample> {
    super::yunet::sample_file(input, config)
}

#[cfg(not(feature = "opencv"))]
fn sample_file(input: &Path, _config: &FaceCropConfig) -> Vec<FaceSample> {
    warn!(
        path = %input.display(),
        "Built without OpenCV, using center crop"
    );
    Vec::new()
}

/// Well-known YuNet model locations, in preference order.
pub const YUNET_MODEL_PATHS: &[&str] = &[
    "./models/face_detection_yunet_2023mar.onnx",
    "./models/face_detection/yunet/face_detection_yunet_2023mar.onnx",
    "/app/models/face_detection_yunet_2023mar.onnx",
    "/app/models/face_detection/yunet/face_detection_yunet_2023mar.onnx",
    "/usr/share/opencv/models/face_detection_yunet_2023mar.onnx",
    "/usr/share/opencv4/models/face_detection_yunet_2023mar.onnx",
];

/// Resolve the YuNet model: the configured path if it exists, else the
/// first well-known location that does.
pub fn find_model_path(config: &FaceCropConfig) -> Option<PathBuf> {
    if let Some(path) = &config.model_path {
        if path.exists() {
            return Some(path.clone());
        }
        warn!(path = %path.display(), "Configured face model not found");
        return None;
    }

    YUNET_MODEL_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}
