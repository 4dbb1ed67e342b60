//! 9:16 crop rectangle centred on the averaged face position.

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};
use crate::filters::filter_crop;

/// Target aspect ratio, width part.
pub const TARGET_ASPECT_W: u64 = 9;

/// Target aspect ratio, height part.
pub const TARGET_ASPECT_H: u64 = 16;

/// Face centre observed in one sampled frame, in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceSample {
    /// Horizontal centre (0.0 = left edge, 1.0 = right edge)
    pub cx: f64,
    /// Vertical centre (0.0 = top edge, 1.0 = bottom edge)
    pub cy: f64,
    /// Normalized face width
    pub width: f64,
    /// Normalized face height
    pub height: f64,
}

/// Pixel crop region inside the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// FFmpeg `crop` filter for this region.
    pub fn to_filter(&self) -> String {
        filter_crop(self.width, self.height, self.x, self.y)
    }
}

/// Mean face centre, or the frame centre without samples.
pub fn average_center(samples: &[FaceSample]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.5, 0.5);
    }
    let n = samples.len() as f64;
    let cx = samples.iter().map(|s| s.cx).sum::<f64>() / n;
    let cy = samples.iter().map(|s| s.cy).sum::<f64>() / n;
    (clamp_unit(cx), clamp_unit(cy))
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.5
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Compute the largest even-sized 9:16 region centred on the faces.
///
/// Full source height is used when the resulting width fits; otherwise full
/// width with the height derived from it. The region is then shifted to stay
/// inside the frame.
pub fn compute_crop_rect(
    samples: &[FaceSample],
    video_width: u32,
    video_height: u32,
) -> MediaResult<CropRect> {
    let invalid = || MediaError::InvalidDimensions {
        width: video_width,
        height: video_height,
    };
    if video_width == 0 || video_height == 0 {
        return Err(invalid());
    }

    let (cx, cy) = average_center(samples);
    let src_w = video_width as u64;
    let src_h = video_height as u64;

    let mut crop_h = src_h;
    let mut crop_w = crop_h * TARGET_ASPECT_W / TARGET_ASPECT_H;
    if crop_w > src_w {
        crop_w = src_w;
        crop_h = crop_w * TARGET_ASPECT_H / TARGET_ASPECT_W;
    }

    // Even dimensions for chroma-subsampled encoders
    crop_w -= crop_w % 2;
    crop_h -= crop_h % 2;
    if crop_w == 0 || crop_h == 0 {
        return Err(invalid());
    }

    let x = place(cx, src_w, crop_w);
    let y = place(cy, src_h, crop_h);

    Ok(CropRect {
        x,
        y,
        width: crop_w as u32,
        height: crop_h as u32,
    })
}

/// Offset of a `size`-long span centred on `center * extent`, kept in bounds.
fn place(center: f64, extent: u64, size: u64) -> u32 {
    let offset = (center * extent as f64 - size as f64 / 2.0).trunc() as i64;
    offset.clamp(0, (extent - size) as i64) as u32
}
