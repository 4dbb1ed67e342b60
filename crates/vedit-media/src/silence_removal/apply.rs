//! Remove silent stretches with a single trim/concat render.
//!
//! Every audible interval becomes a `trim`/`atrim` pair in one filter graph,
//! so the whole cut is one FFmpeg invocation. Graphs with many segments are
//! written to a script file to stay clear of command-line length limits.

use std::path::Path;
use tracing::{debug, info, warn};

use super::config::SilenceRemovalConfig;
use super::detect::detect_silence;
use super::intervals::{complement, total_duration, Interval};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::filters::{filter_trim_concat, CONCAT_AUDIO_LABEL, CONCAT_VIDEO_LABEL};
use crate::fs_utils::copy_file;
use crate::probe;
use crate::progress::ProgressReporter;

/// Segments shorter than this (seconds) are left out of the render.
pub const MIN_SEGMENT_SECS: f64 = 0.001;

/// Remove silent stretches from `input`, writing the result to `output`.
///
/// Files with no detected silence, or with nothing but silence, are copied
/// through unchanged.
pub async fn remove_silence(
    input: &Path,
    output: &Path,
    config: &SilenceRemovalConfig,
    runner: &FfmpegRunner,
    progress: &ProgressReporter,
) -> MediaResult<()> {
    progress.report(10.0);

    let silent = detect_silence(input, config, runner).await?;
    progress.report(30.0);

    if silent.is_empty() {
        info!("No silence detected, copying original");
        return copy_through(input, output, progress).await;
    }

    let total = probe::duration(input).await?;
    let audible = complement(&silent, total);
    progress.report(50.0);

    if audible.is_empty() {
        warn!("No audible segments found, copying original");
        return copy_through(input, output, progress).await;
    }

    let segments = renderable_segments(&audible);
    if segments.is_empty() {
        warn!("Audible segments too short to render, copying original");
        return copy_through(input, output, progress).await;
    }

    render_segments(input, output, &segments, config, runner, progress).await?;
    progress.report(100.0);

    info!(
        removed = silent.len(),
        kept = segments.len(),
        kept_secs = total_duration(&segments),
        original_secs = total,
        "Silence removal complete"
    );
    Ok(())
}

/// Drop segments too short for `trim` to produce a frame.
fn renderable_segments(audible: &[Interval]) -> Vec<Interval> {
    audible
        .iter()
        .copied()
        .filter(|seg| seg.duration() >= MIN_SEGMENT_SECS)
        .collect()
}

async fn copy_through(input: &Path, output: &Path, progress: &ProgressReporter) -> MediaResult<()> {
    copy_file(input, output).await?;
    progress.report(100.0);
    Ok(())
}

/// Render `segments` of `input` back to back into `output`.
async fn render_segments(
    input: &Path,
    output: &Path,
    segments: &[Interval],
    config: &SilenceRemovalConfig,
    runner: &FfmpegRunner,
    progress: &ProgressReporter,
) -> MediaResult<()> {
    let graph = filter_trim_concat(segments);

    // Kept alive until the render finishes
    let script = if segments.len() > config.max_inline_segments {
        let file = tempfile::Builder::new()
            .prefix("vedit_silence_")
            .suffix(".txt")
            .tempfile()?;
        tokio::fs::write(file.path(), &graph).await?;
        debug!(
            segments = segments.len(),
            script = %file.path().display(),
            "Using filter script for silence removal"
        );
        Some(file)
    } else {
        None
    };

    let cmd = FfmpegCommand::new(input, output);
    let cmd = match &script {
        Some(file) => cmd.filter_complex_script(file.path()),
        None => cmd.filter_complex(graph),
    };
    let cmd = cmd.map(CONCAT_VIDEO_LABEL).map(CONCAT_AUDIO_LABEL);

    let kept_secs = total_duration(segments);
    let reporter = progress.clone();
    let result = runner
        .run_with_progress(&cmd, move |p| {
            reporter.report_between(50.0, 100.0, p.fraction(kept_secs));
        })
        .await;

    drop(script);
    result
}
