//! Silence detection via FFmpeg's `silencedetect` filter.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::config::SilenceRemovalConfig;
use super::intervals::Interval;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe;

static SILENCE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_start:\s*(-?[\d.]+(?:[eE][-+]?\d+)?)").expect("static regex")
});

static SILENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_end:\s*(-?[\d.]+(?:[eE][-+]?\d+)?)").expect("static regex")
});

/// Detect silent intervals over the whole of `input`.
///
/// The analysis decodes the full file into the null muxer; a non-zero exit
/// fails with a codec error.
pub async fn detect_silence(
    input: &Path,
    config: &SilenceRemovalConfig,
    runner: &FfmpegRunner,
) -> MediaResult<Vec<Interval>> {
    debug!(
        path = %input.display(),
        threshold_db = config.threshold_db,
        min_duration = config.min_duration,
        "Starting silence detection"
    );

    let cmd = FfmpegCommand::analyze(input)
        .audio_filter(config.detect_filter())
        .output_args(["-f", "null"])
        .log_level("info");
    let diagnostics = runner.run_capture(&cmd).await?;

    let total = probe::duration(input).await?;
    let silent = parse_silence_markers(&diagnostics, total);

    info!(
        segments = silent.len(),
        total_duration = total,
        "Detected silent segments"
    );
    Ok(silent)
}

/// Pair `silence_start` / `silence_end` markers into intervals.
///
/// Markers pair by order of appearance. A start without a matching end runs
/// to `total_duration`; ends past it are clamped and negative starts clamp to
/// zero. Empty or inverted intervals are dropped.
pub fn parse_silence_markers(diagnostics: &str, total_duration: f64) -> Vec<Interval> {
    let mut starts: Vec<f64> = Vec::new();
    let mut ends: Vec<f64> = Vec::new();

    for line in diagnostics.lines() {
        if let Some(value) = capture_seconds(&SILENCE_START, line) {
            starts.push(value.max(0.0));
        }
        if let Some(value) = capture_seconds(&SILENCE_END, line) {
            ends.push(value);
        }
    }

    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let end = ends
                .get(i)
                .copied()
                .unwrap_or(total_duration)
                .min(total_duration);
            (end > start).then(|| Interval::new(start, end))
        })
        .collect()
}

fn capture_seconds(pattern: &Regex, line: &str) -> Option<f64> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[silencedetect @ 0x5581c0] silence_start: 3.504
[silencedetect @ 0x5581c0] silence_end: 5.016 | silence_duration: 1.512
size=N/A time=00:00:10.00 bitrate=N/A speed= 412x
[silencedetect @ 0x5581c0] silence_start: 8.25
[silencedetect @ 0x5581c0] silence_end: 9.5 | silence_duration: 1.25";

    #[test]
    fn test_paired_markers() {
        let silent = parse_silence_markers(SAMPLE, 10.0);
        assert_eq!(
            silent,
            vec![Interval::new(3.504, 5.016), Interval::new(8.25, 9.5)]
        );
    }

    #[test]
    fn test_unmatched_start_closes_at_duration() {
        let text = "[silencedetect @ 0x1] silence_start: 12.0";
        assert_eq!(
            parse_silence_markers(text, 20.0),
            vec![Interval::new(12.0, 20.0)]
        );
    }

    #[test]
    fn test_negative_start_clamped() {
        let text = "\
[silencedetect @ 0x1] silence_start: -0.0213333
[silencedetect @ 0x1] silence_end: 1.5 | silence_duration: 1.52";
        assert_eq!(
            parse_silence_markers(text, 10.0),
            vec![Interval::new(0.0, 1.5)]
        );
    }

    #[test]
    fn test_scientific_notation() {
        let text = "\
[silencedetect @ 0x1] silence_start: -2.08333e-05
[silencedetect @ 0x1] silence_end: 2.5 | silence_duration: 2.5";
        assert_eq!(
            parse_silence_markers(text, 10.0),
            vec![Interval::new(0.0, 2.5)]
        );
    }

    #[test]
    fn test_end_clamped_to_duration() {
        let text = "\
[silencedetect @ 0x1] silence_start: 9.0
[silencedetect @ 0x1] silence_end: 10.04 | silence_duration: 1.04";
        assert_eq!(
            parse_silence_markers(text, 10.0),
            vec![Interval::new(9.0, 10.0)]
        );
    }

    #[test]
    fn test_degenerate_intervals_dropped() {
        let text = "\
[silencedetect @ 0x1] silence_start: 10.0
[silencedetect @ 0x1] silence_end: 10.0 | silence_duration: 0";
        assert!(parse_silence_markers(text, 10.0).is_empty());
    }

    #[test]
    fn test_no_markers() {
        assert!(parse_silence_markers("Input #0, mov,mp4,m4a", 10.0).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detect_silence_reads_markers_between_stats_updates() {
        use crate::test_tools::StubTools;

        // Stats updates end in '\r', so markers share a physical line with them
        let stderr = "\
size=N/A time=00:00:04.00 bitrate=N/A speed= 400x\r\
[silencedetect @ 0x1] silence_start: 5\n\
[silencedetect @ 0x1] silence_end: 7 | silence_duration: 2\r\
size=N/A time=00:00:11.00 bitrate=N/A speed= 410x\r\
[silencedetect @ 0x1] silence_start: 12\n\
[silencedetect @ 0x1] silence_end: 14 | silence_duration: 2\n";
        let tools = StubTools::new()
            .analysis_stderr(stderr)
            .duration(20.0)
            .install()
            .await;
        let input = tools.media_dir().join("talk.mp4");
        std::fs::write(&input, b"source").unwrap();

        let silent = detect_silence(&input, &SilenceRemovalConfig::default(), &FfmpegRunner::new())
            .await
            .unwrap();
        assert_eq!(
            silent,
            vec![Interval::new(5.0, 7.0), Interval::new(12.0, 14.0)]
        );

        let calls = tools.ffmpeg_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("-nostats"));
        assert!(calls[0].ends_with("-f null -"));
    }
}
