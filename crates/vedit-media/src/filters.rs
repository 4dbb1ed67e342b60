//! FFmpeg filter definitions.

use crate::command::format_seconds;
use crate::error::{MediaError, MediaResult};
use crate::silence_removal::Interval;

/// Lowest factor a single `atempo` instance accepts.
pub const ATEMPO_MIN: f64 = 0.5;

/// Highest factor a single `atempo` instance accepts.
pub const ATEMPO_MAX: f64 = 2.0;

/// Reject speed factors FFmpeg cannot express.
pub fn validate_speed_factor(factor: f64) -> MediaResult<f64> {
    if factor.is_finite() && factor > 0.0 {
        Ok(factor)
    } else {
        Err(MediaError::invalid_parameter(format!(
            "speed factor must be positive and finite, got {}",
            factor
        )))
    }
}

/// Split a tempo factor into `atempo` stages whose product is `factor`.
///
/// Full 2.0x (or 0.5x) stages are emitted until the remainder fits the
/// accepted range, then the remainder closes the chain.
pub fn atempo_stages(factor: f64) -> MediaResult<Vec<f64>> {
    let mut remaining = validate_speed_factor(factor)?;
    let mut stages = Vec::new();

    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);

    Ok(stages)
}

/// Build the audio filter for a tempo change (`atempo=a,atempo=b,...`).
pub fn filter_atempo(factor: f64) -> MediaResult<String> {
    Ok(atempo_stages(factor)?
        .iter()
        .map(|stage| format!("atempo={:.6}", stage))
        .collect::<Vec<_>>()
        .join(","))
}

/// Build the video filter for a speed change.
pub fn filter_setpts(factor: f64) -> MediaResult<String> {
    let factor = validate_speed_factor(factor)?;
    Ok(format!("setpts={:.6}*PTS", 1.0 / factor))
}

/// Build the video fade-out filter.
pub fn filter_fade_out(start: f64, duration: f64) -> String {
    format!(
        "fade=t=out:st={}:d={}",
        format_seconds(start),
        format_seconds(duration)
    )
}

/// Build the audio fade-out filter.
pub fn filter_afade_out(start: f64, duration: f64) -> String {
    format!(
        "afade=t=out:st={}:d={}",
        format_seconds(start),
        format_seconds(duration)
    )
}

/// Build a crop filter.
pub fn filter_crop(width: u32, height: u32, x: u32, y: u32) -> String {
    format!("crop={}:{}:{}:{}", width, height, x, y)
}

/// Output label of the concatenated video stream.
pub const CONCAT_VIDEO_LABEL: &str = "[outv]";

/// Output label of the concatenated audio stream.
pub const CONCAT_AUDIO_LABEL: &str = "[outa]";

/// Build a filter graph keeping only `segments`, joined in the given order.
///
/// Each segment becomes a `trim`/`atrim` pair with reset timestamps; a single
/// `concat` joins them into [`CONCAT_VIDEO_LABEL`] and [`CONCAT_AUDIO_LABEL`].
pub fn filter_trim_concat(segments: &[Interval]) -> String {
    let mut graph = String::new();

    for (i, seg) in segments.iter().enumerate() {
        let start = format_seconds(seg.start);
        let duration = format_seconds(seg.duration());
        graph.push_str(&format!(
            "[0:v]trim=start={start}:duration={duration},setpts=PTS-STARTPTS[v{i}];"
        ));
        graph.push_str(&format!(
            "[0:a]atrim=start={start}:duration={duration},asetpts=PTS-STARTPTS[a{i}];"
        ));
    }

    for i in 0..segments.len() {
        graph.push_str(&format!("[v{i}][a{i}]"));
    }
    graph.push_str(&format!(
        "concat=n={}:v=1:a=1{}{}",
        segments.len(),
        CONCAT_VIDEO_LABEL,
        CONCAT_AUDIO_LABEL
    ));

    graph
}
