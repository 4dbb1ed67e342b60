//! Structured edit operations applied as a chain of FFmpeg invocations.
//!
//! Each operation reads the previous operation's output. All but the last
//! write to intermediates that are unlinked when the chain ends.

use std::path::Path;
use tracing::{debug, info};
use vedit_models::EditOperation;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{filter_afade_out, filter_atempo, filter_fade_out, filter_setpts};
use crate::fs_utils::{copy_file, extension_of, ArtifactSet};
use crate::probe;
use crate::progress::ProgressReporter;

/// Apply `operations` in order, writing the result to `output`.
///
/// An empty list copies `input` unchanged. Operation kinds this module
/// cannot apply fail the whole chain before any process is spawned.
pub async fn apply_operations(
    input: &Path,
    output: &Path,
    operations: &[EditOperation],
    runner: &FfmpegRunner,
    progress: &ProgressReporter,
) -> MediaResult<()> {
    if operations.is_empty() {
        copy_file(input, output).await?;
        progress.report(100.0);
        return Ok(());
    }

    for op in operations {
        validate_operation(op)?;
    }

    let work_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut artifacts = ArtifactSet::with_prefix(work_dir, "_edit");
    let extension = extension_of(output);

    let total = operations.len();
    let mut current = input.to_path_buf();

    for (i, op) in operations.iter().enumerate() {
        progress.report(i as f64 / total as f64 * 100.0);

        let target = if i + 1 == total {
            output.to_path_buf()
        } else {
            artifacts.allocate(i, &extension)
        };

        info!(
            operation = %op,
            index = i + 1,
            total = total,
            "Applying edit operation"
        );
        apply_operation(&current, &target, op, runner).await?;
        current = target;
    }

    progress.report(100.0);
    Ok(())
}

/// Apply a single operation.
pub async fn apply_operation(
    input: &Path,
    output: &Path,
    op: &EditOperation,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let duration = if needs_duration(op) {
        Some(probe::duration(input).await?)
    } else {
        None
    };

    let cmd = operation_command(input, output, op, duration)?;
    debug!(operation = %op, "Built edit command: {:?}", cmd.build_args());
    runner.run(&cmd).await
}

/// Check an operation can be applied without touching the filesystem.
pub fn validate_operation(op: &EditOperation) -> MediaResult<()> {
    match op {
        EditOperation::TrimStart { seconds }
        | EditOperation::TrimEnd { seconds }
        | EditOperation::FadeOut { seconds } => validate_seconds(op, *seconds),
        EditOperation::Speed { factor } => filter_setpts(*factor).map(|_| ()),
        EditOperation::Unsupported { .. } => {
            Err(MediaError::UnsupportedOperation(op.kind().to_string()))
        }
    }
}

fn validate_seconds(op: &EditOperation, seconds: f64) -> MediaResult<()> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(MediaError::invalid_parameter(format!(
            "{} needs a non-negative duration, got {}",
            op.kind(),
            seconds
        )))
    }
}

fn needs_duration(op: &EditOperation) -> bool {
    matches!(
        op,
        EditOperation::TrimEnd { .. } | EditOperation::FadeOut { .. }
    )
}

/// Build the FFmpeg command for one operation.
///
/// `duration` is the probed input duration, required by `trim_end` and
/// `fade_out`.
fn operation_command(
    input: &Path,
    output: &Path,
    op: &EditOperation,
    duration: Option<f64>,
) -> MediaResult<FfmpegCommand> {
    validate_operation(op)?;
    let cmd = FfmpegCommand::new(input, output);

    let cmd = match op {
        EditOperation::TrimStart { seconds } => cmd.output_seek(*seconds).stream_copy(),
        EditOperation::TrimEnd { seconds } => {
            let total = require_duration(input, duration)?;
            cmd.output_duration((total - seconds).max(0.0)).stream_copy()
        }
        EditOperation::Speed { factor } => cmd.output_args([
            "-filter:v".to_string(),
            filter_setpts(*factor)?,
            "-filter:a".to_string(),
            filter_atempo(*factor)?,
        ]),
        EditOperation::FadeOut { seconds } => {
            let total = require_duration(input, duration)?;
            let start = (total - seconds).max(0.0);
            cmd.video_filter(filter_fade_out(start, *seconds))
                .audio_filter(filter_afade_out(start, *seconds))
        }
        EditOperation::Unsupported { .. } => {
            return Err(MediaError::UnsupportedOperation(op.kind().to_string()))
        }
    };

    Ok(cmd)
}

fn require_duration(input: &Path, duration: Option<f64>) -> MediaResult<f64> {
    duration.ok_or_else(|| MediaError::probe(input, "duration required but not probed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn args_of(op: EditOperation, duration: Option<f64>) -> Vec<String> {
        operation_command(Path::new("in.mp4"), Path::new("out.mp4"), &op, duration)
            .unwrap()
            .build_args()
    }

    fn value_after(args: &[String], flag: &str) -> String {
        let pos = args.iter().position(|a| a == flag).unwrap();
        args[pos + 1].clone()
    }

    #[test]
    fn test_trim_start_command() {
        let args = args_of(EditOperation::TrimStart { seconds: 10.0 }, None);
        assert_eq!(value_after(&args, "-ss"), "10.000000");
        assert_eq!(value_after(&args, "-c"), "copy");
    }

    #[test]
    fn test_trim_end_command_clamps_to_zero() {
        let args = args_of(EditOperation::TrimEnd { seconds: 5.0 }, Some(30.0));
        assert_eq!(value_after(&args, "-t"), "25.000000");

        let args = args_of(EditOperation::TrimEnd { seconds: 50.0 }, Some(30.0));
        assert_eq!(value_after(&args, "-t"), "0.000000");
    }

    #[test]
    fn test_speed_command() {
        let args = args_of(EditOperation::Speed { factor: 3.0 }, None);
        assert!(value_after(&args, "-filter:v").starts_with("setpts=0.333333"));
        assert_eq!(
            value_after(&args, "-filter:a"),
            "atempo=2.000000,atempo=1.500000"
        );
    }

    #[test]
    fn test_fade_out_command() {
        let args = args_of(EditOperation::FadeOut { seconds: 2.0 }, Some(10.0));
        assert_eq!(value_after(&args, "-vf"), "fade=t=out:st=8.000000:d=2.000000");
        assert_eq!(value_after(&args, "-af"), "afade=t=out:st=8.000000:d=2.000000");

        // Fade longer than the video starts at zero
        let args = args_of(EditOperation::FadeOut { seconds: 20.0 }, Some(10.0));
        assert!(value_after(&args, "-vf").starts_with("fade=t=out:st=0.000000"));
    }

    #[test]
    fn test_validation() {
        assert!(validate_operation(&EditOperation::TrimStart { seconds: 1.0 }).is_ok());
        assert!(matches!(
            validate_operation(&EditOperation::TrimStart { seconds: -1.0 }),
            Err(MediaError::InvalidParameter(_))
        ));
        assert!(matches!(
            validate_operation(&EditOperation::Speed { factor: 0.0 }),
            Err(MediaError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_operations_copy_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.mp4");
        tokio::fs::write(&input, b"original bytes").await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress = ProgressReporter::new(0, 1, "Natural Language Editing", tx);

        apply_operations(&input, &output, &[], &FfmpegRunner::new(), &progress)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"original bytes");
        assert_eq!(rx.try_recv().unwrap().step_progress, 100.0);
    }

    #[tokio::test]
    async fn test_unsupported_operation_fails_before_running() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.mp4");
        tokio::fs::write(&input, b"original bytes").await.unwrap();

        let ops: Vec<EditOperation> = serde_json::from_value(json!([
            {"type": "trim_start", "seconds": 1},
            {"type": "reverse"}
        ]))
        .unwrap();

        let err = apply_operations(
            &input,
            &output,
            &ops,
            &FfmpegRunner::new(),
            &ProgressReporter::detached("edit"),
        )
        .await
        .unwrap_err();

        match err {
            MediaError::UnsupportedOperation(kind) => assert_eq!(kind, "reverse"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }
}
