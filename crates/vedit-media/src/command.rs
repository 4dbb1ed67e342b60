//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::progress::FfmpegProgress;

/// Bytes of FFmpeg diagnostics surfaced in a failure.
pub const DIAGNOSTIC_TAIL_BYTES: usize = 500;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path (`-` for null muxer runs)
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Create an analysis-only command that decodes `input` into the null muxer.
    ///
    /// Periodic stats are switched off; only filter log output is wanted.
    pub fn analyze(input: impl AsRef<Path>) -> Self {
        Self::new(input, "-").input_arg("-nostats")
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set output seek position (frame accurate, after -i).
    pub fn output_seek(self, seconds: f64) -> Self {
        self.output_arg("-ss").output_arg(format_seconds(seconds))
    }

    /// Limit output duration.
    pub fn output_duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format_seconds(seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set audio filter.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Read the filter complex from a script file.
    pub fn filter_complex_script(self, path: impl AsRef<Path>) -> Self {
        self.output_arg("-filter_complex_script")
            .output_arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Map a stream or filter-graph label into the output.
    pub fn map(self, label: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(label)
    }

    /// Copy every stream without re-encoding.
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        // Log level
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        // Input args
        args.extend(self.input_args.clone());

        // Input file
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        // Output args
        args.extend(self.output_args.clone());

        // Output file
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Format seconds the way every filter and seek argument expects them.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.6}", seconds)
}

/// Runner for FFmpeg commands with progress tracking.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Timeout applied to each invocation, if any.
    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.execute(cmd, |_| {}).await.map(|_| ())
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        self.execute(cmd, progress_callback).await.map(|_| ())
    }

    /// Run an FFmpeg command and return its diagnostic output.
    ///
    /// `-progress` lines are stripped; everything else FFmpeg wrote to
    /// stderr is returned, which is where analysis filters print.
    pub async fn run_capture(&self, cmd: &FfmpegCommand) -> MediaResult<String> {
        self.execute(cmd, |_| {}).await
    }

    async fn execute<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<String>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        // Check FFmpeg exists
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let started = Instant::now();
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::codec_failed("FFmpeg stderr not captured", None, ""))?;
        // Spawn stderr reader: progress blocks go to the callback, the rest is kept
        let reader_handle = tokio::spawn(drain_stderr(stderr, progress_callback));

        let status = self.wait_for_completion(&mut child).await;

        // Wait for the reader to drain stderr
        let diagnostics = reader_handle.await.unwrap_or_default();
        metrics::record_ffmpeg_run(started.elapsed().as_secs_f64(), status.is_ok());

        let status = status?;
        if status.success() {
            Ok(diagnostics)
        } else {
            metrics::record_ffmpeg_failure();
            Err(MediaError::codec_failed(
                "FFmpeg exited with non-zero status",
                status.code(),
                diagnostic_tail(&diagnostics, DIAGNOSTIC_TAIL_BYTES),
            ))
        }
    }

    /// Wait for child process with optional timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let Some(timeout_secs) = self.timeout_secs else {
            return Ok(child.wait().await?);
        };

        let timeout = tokio::time::timeout(
            std::time::Duration::from_secs(timeout_secs),
            child.wait(),
        );
        match timeout.await {
            Ok(result) => Ok(result?),
            Err(_) => {
                // Timeout - kill the process
                warn!("FFmpeg timed out after {} seconds, killing process", timeout_secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(timeout_secs))
            }
        }
    }
}

/// Classification of one stderr line.
#[derive(Debug)]
enum ProgressLine {
    /// `progress=continue|end`, closing a block
    BlockEnd(FfmpegProgress),
    /// Any other `-progress` key
    Field,
    /// Regular FFmpeg log output
    Diagnostic,
}

/// Read FFmpeg's stderr to the end.
///
/// Stats lines end in `\r` and log lines in `\n`, so both terminate a line.
/// Progress blocks go to `progress_callback`; every other line is returned.
async fn drain_stderr<R, F>(stderr: R, progress_callback: F) -> String
where
    R: AsyncRead + Unpin,
    F: Fn(FfmpegProgress),
{
    let mut reader = BufReader::new(stderr);
    let mut current_progress = FfmpegProgress::default();
    let mut diagnostics: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let chunk = String::from_utf8_lossy(&buf);
        for line in chunk.split(['\r', '\n']).filter(|l| !l.trim().is_empty()) {
            match parse_progress_line(line, &mut current_progress) {
                ProgressLine::BlockEnd(progress) => progress_callback(progress),
                ProgressLine::Field => {}
                ProgressLine::Diagnostic => diagnostics.push(line.to_string()),
            }
        }
    }

    diagnostics.join("\n")
}

/// Parse a progress line from FFmpeg's -progress output.
///
/// A known key whose value does not parse is not a progress line; `N/A`
/// is accepted as "unknown".
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> ProgressLine {
    let line = line.trim();

    let Some((key, value)) = line.split_once('=') else {
        return ProgressLine::Diagnostic;
    };
    let value = value.trim();
    if value == "N/A" {
        return match key {
            "out_time_ms" | "out_time_us" | "frame" | "fps" | "speed" | "bitrate"
            | "total_size" | "out_time" => ProgressLine::Field,
            _ => ProgressLine::Diagnostic,
        };
    }

    let parsed = match key {
        "out_time_ms" | "out_time_us" => {
            // Both keys carry microseconds despite the name
            value.parse::<i64>().map(|us| current.out_time_ms = us / 1000).is_ok()
        }
        "frame" => value.parse::<u64>().map(|frame| current.frame = frame).is_ok(),
        "fps" => value.parse::<f64>().map(|fps| current.fps = fps).is_ok(),
        "speed" => {
            // Format: "1.5x"
            value
                .strip_suffix('x')
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(|speed| current.speed = speed)
                .is_some()
        }
        "progress" => match value {
            "continue" => return ProgressLine::BlockEnd(current.clone()),
            "end" => {
                current.is_complete = true;
                return ProgressLine::BlockEnd(current.clone());
            }
            _ => false,
        },
        "bitrate" | "total_size" | "out_time" | "dup_frames" | "drop_frames" => {
            !value.contains(char::is_whitespace)
        }
        k if k.starts_with("stream_") => !value.contains(char::is_whitespace),
        _ => false,
    };

    if parsed {
        ProgressLine::Field
    } else {
        ProgressLine::Diagnostic
    }
}

/// Last `max_bytes` of `text`, cut on a character boundary.
pub fn diagnostic_tail(text: &str, max_bytes: usize) -> &str {
    let text = text.trim_end();
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
