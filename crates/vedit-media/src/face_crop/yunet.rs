//! OpenCV-backed frame source and YuNet face model.
//!
//! YuNet is exposed through OpenCV's `FaceDetectorYN`. Frames are resized to
//! a detector input aligned to multiples of 32 and boxes are reported
//! relative to that input, which makes them resolution independent.

use opencv::core::{Mat, Ptr, Size};
use opencv::imgproc;
use opencv::objdetect::FaceDetectorYN;
use opencv::prelude::{FaceDetectorYNTrait, MatTraitConst, VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::videoio::{
    VideoCapture, CAP_ANY, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH,
    CAP_PROP_POS_FRAMES,
};
use std::path::Path;
use tracing::{debug, info, warn};

use super::config::FaceCropConfig;
use super::crop_rect::FaceSample;
use super::sampling::{find_model_path, sample_positions, FaceDetection, FaceModel, FrameSource};
use crate::error::{MediaError, MediaResult};

/// NMS threshold for face detection
const NMS_THRESHOLD: f32 = 0.3;

/// Top K faces to keep
const TOP_K: i32 = 10;

/// Columns in a YuNet result row (box, five landmarks, score).
const RESULT_COLUMNS: i32 = 15;

fn cv_error(context: &str, e: opencv::Error) -> MediaError {
    MediaError::detection_failed(format!("{}: {}", context, e))
}

/// Sample face centres from the video file at `input`.
///
/// Blocking. Returns no samples when the video cannot be opened or no model
/// is available.
pub fn sample_file(input: &Path, config: &FaceCropConfig) -> Vec<FaceSample> {
    let Some(model_path) = find_model_path(config) else {
        warn!("YuNet model not found, using center crop");
        return Vec::new();
    };

    let mut source = match VideoCaptureSource::open(input) {
        Ok(source) => source,
        Err(e) => {
            warn!(path = %input.display(), "Cannot open video for face sampling: {}", e);
            return Vec::new();
        }
    };

    let (width, height) = source.dimensions();
    let mut model = match YuNetModel::new(&model_path, width, height, config.score_threshold) {
        Ok(model) => model,
        Err(e) => {
            warn!("YuNet unavailable, using center crop: {}", e);
            return Vec::new();
        }
    };

    sample_positions(&mut source, &mut model, config.sample_count)
}

/// Frames decoded with OpenCV `VideoCapture`.
pub struct VideoCaptureSource {
    cap: VideoCapture,
}

impl VideoCaptureSource {
    pub fn open(path: &Path) -> MediaResult<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| MediaError::SourceUnreadable(path.to_path_buf()))?;
        let cap = VideoCapture::from_file(path_str, CAP_ANY)
            .map_err(|e| cv_error("Failed to open video", e))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::SourceUnreadable(path.to_path_buf()));
        }
        Ok(Self { cap })
    }

    /// Frame size reported by the container.
    pub fn dimensions(&self) -> (u32, u32) {
        let width = self.cap.get(CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
        let height = self.cap.get(CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
        (width.max(0.0) as u32, height.max(0.0) as u32)
    }
}

impl FrameSource for VideoCaptureSource {
    type Frame = Mat;

    fn frame_count(&mut self) -> i64 {
        self.cap.get(CAP_PROP_FRAME_COUNT).unwrap_or(0.0) as i64
    }

    fn read_frame(&mut self, index: i64) -> MediaResult<Option<Mat>> {
        self.cap
            .set(CAP_PROP_POS_FRAMES, index as f64)
            .map_err(|e| cv_error("Seek failed", e))?;

        let mut frame = Mat::default();
        let ok = self
            .cap
            .read(&mut frame)
            .map_err(|e| cv_error("Read failed", e))?;

        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// YuNet face detector.
pub struct YuNetModel {
    detector: Ptr<FaceDetectorYN>,
    input_size: (i32, i32),
    score_threshold: f32,
}

impl YuNetModel {
    pub fn new(
        model_path: &Path,
        frame_width: u32,
        frame_height: u32,
        score_threshold: f32,
    ) -> MediaResult<Self> {
        let model = model_path
            .to_str()
            .ok_or_else(|| MediaError::detection_failed("Model path is not valid UTF-8"))?;
        let input_size = calculate_input_size(frame_width, frame_height);

        let detector = FaceDetectorYN::create(
            model,
            "",
            Size::new(input_size.0, input_size.1),
            score_threshold,
            NMS_THRESHOLD,
            TOP_K,
            opencv::dnn::DNN_BACKEND_DEFAULT,
            opencv::dnn::DNN_TARGET_CPU,
        )
        .map_err(|e| cv_error("Failed to create YuNet detector", e))?;

        info!(
            "YuNet detector initialized: input_size={}x{}, model={}",
            input_size.0,
            input_size.1,
            model_path.display()
        );

        Ok(Self {
            detector,
            input_size,
            score_threshold,
        })
    }
}

impl FaceModel<Mat> for YuNetModel {
    fn detect(&mut self, frame: &Mat) -> MediaResult<Vec<FaceDetection>> {
        if frame.empty() || frame.cols() <= 0 || frame.rows() <= 0 {
            return Ok(Vec::new());
        }

        let size = Size::new(self.input_size.0, self.input_size.1);
        let mut resized = Mat::default();
        imgproc::resize(frame, &mut resized, size, 0.0, 0.0, imgproc::INTER_LINEAR)
            .map_err(|e| cv_error("Resize failed", e))?;

        if let Err(e) = self.detector.set_input_size(size) {
            debug!("Failed to set input size (may be OK): {}", e);
        }

        let mut faces = Mat::default();
        self.detector
            .detect(&resized, &mut faces)
            .map_err(|e| cv_error("YuNet detection failed", e))?;

        parse_faces(&faces, self.input_size, self.score_threshold)
    }
}

/// Convert YuNet output rows into normalized detections.
///
/// Row layout: `[x, y, w, h, 10 landmark coords, score]` in input pixels.
fn parse_faces(
    faces: &Mat,
    input_size: (i32, i32),
    score_threshold: f32,
) -> MediaResult<Vec<FaceDetection>> {
    if faces.rows() <= 0 {
        return Ok(Vec::new());
    }
    if faces.cols() < RESULT_COLUMNS {
        warn!(
            "YuNet output has unexpected format: {} columns (expected {})",
            faces.cols(),
            RESULT_COLUMNS
        );
        return Ok(Vec::new());
    }

    let in_w = input_size.0 as f64;
    let in_h = input_size.1 as f64;
    let mut detections = Vec::with_capacity(faces.rows() as usize);

    for i in 0..faces.rows() {
        let value = |col: i32| faces.at_2d::<f32>(i, col).map(|v| *v as f64);
        let (Ok(x), Ok(y), Ok(w), Ok(h), Ok(score)) =
            (value(0), value(1), value(2), value(3), value(RESULT_COLUMNS - 1))
        else {
            continue;
        };

        if w <= 0.0 || h <= 0.0 || score < score_threshold as f64 {
            continue;
        }

        detections.push(FaceDetection {
            x: x / in_w,
            y: y / in_h,
            width: w / in_w,
            height: h / in_h,
            confidence: score,
        });
    }

    Ok(detections)
}

/// Detector input size: at most 960x540, aligned to multiples of 32.
fn calculate_input_size(frame_width: u32, frame_height: u32) -> (i32, i32) {
    const TARGET_WIDTH: f64 = 960.0;
    const TARGET_HEIGHT: f64 = 540.0;
    const ALIGNMENT: i32 = 32;

    if frame_width == 0 || frame_height == 0 {
        return (TARGET_WIDTH as i32, TARGET_HEIGHT as i32);
    }

    let scale = (frame_width as f64 / TARGET_WIDTH)
        .max(frame_height as f64 / TARGET_HEIGHT)
        .max(1.0);

    let width = (frame_width as f64 / scale).round() as i32;
    let height = (frame_height as f64 / scale).round() as i32;

    let width = ((width + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT;
    let height = ((height + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT;

    (width.clamp(160, 960), height.clamp(120, 540))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_size_aligned() {
        assert_eq!(calculate_input_size(1920, 1080), (960, 540));
        let (w, h) = calculate_input_size(1280, 720);
        assert_eq!(w % 32, 0);
        assert!(h <= 540);
    }

    #[test]
    fn test_input_size_unknown_frame() {
        assert_eq!(calculate_input_size(0, 0), (960, 540));
    }
}
