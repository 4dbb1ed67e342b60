//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use vedit_media::{FaceCropConfig, FfmpegRunner, SilenceRemovalConfig};
use vedit_models::VideoRecord;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding uploaded sources and their metadata records
    pub upload_dir: PathBuf,
    /// Directory receiving processed outputs
    pub processed_dir: PathBuf,
    /// File name prefix of processed outputs
    pub processed_prefix: String,
    /// Directory for pipeline intermediates
    pub work_dir: PathBuf,
    /// Per-invocation FFmpeg timeout; unset means no limit
    pub codec_timeout_secs: Option<u64>,
    /// Silence detection threshold in dB
    pub silence_threshold_db: f64,
    /// Shortest silence worth cutting, in seconds
    pub silence_min_duration: f64,
    /// Frames sampled for face detection
    pub face_sample_count: usize,
    /// YuNet model override
    pub face_model_path: Option<PathBuf>,
    /// Prometheus listener address; unset disables the exporter
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let silence = SilenceRemovalConfig::default();
        let face = FaceCropConfig::default();
        Self {
            upload_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            processed_prefix: "processed_".to_string(),
            work_dir: std::env::temp_dir().join("vedit"),
            codec_timeout_secs: None,
            silence_threshold_db: silence.threshold_db,
            silence_min_duration: silence.min_duration,
            face_sample_count: face.sample_count,
            face_model_path: None,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from `VIDEO_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparseable ones are
    /// configuration errors.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            upload_dir: var("VIDEO_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            processed_dir: var("VIDEO_PROCESSED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_dir),
            processed_prefix: var("VIDEO_PROCESSED_PREFIX").unwrap_or(defaults.processed_prefix),
            work_dir: var("VIDEO_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            codec_timeout_secs: parse_opt("VIDEO_CODEC_TIMEOUT_SECS", var("VIDEO_CODEC_TIMEOUT_SECS"))?,
            silence_threshold_db: parse_opt("VIDEO_SILENCE_THRESHOLD_DB", var("VIDEO_SILENCE_THRESHOLD_DB"))?
                .unwrap_or(defaults.silence_threshold_db),
            silence_min_duration: parse_opt("VIDEO_SILENCE_MIN_DURATION", var("VIDEO_SILENCE_MIN_DURATION"))?
                .unwrap_or(defaults.silence_min_duration),
            face_sample_count: parse_opt("VIDEO_FACE_SAMPLE_COUNT", var("VIDEO_FACE_SAMPLE_COUNT"))?
                .unwrap_or(defaults.face_sample_count),
            face_model_path: var("VIDEO_FACE_MODEL_PATH").map(PathBuf::from),
            metrics_addr: parse_opt("VIDEO_METRICS_ADDR", var("VIDEO_METRICS_ADDR"))?,
        })
    }

    /// Path of the uploaded source for `record`.
    pub fn input_path(&self, record: &VideoRecord) -> PathBuf {
        self.upload_dir.join(record.source_file_name())
    }

    /// Path the processed output of `record` is written to.
    pub fn output_path(&self, record: &VideoRecord) -> PathBuf {
        self.processed_dir
            .join(record.processed_file_name(&self.processed_prefix))
    }

    pub fn ffmpeg_runner(&self) -> FfmpegRunner {
        match self.codec_timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        }
    }

    pub fn silence_config(&self) -> SilenceRemovalConfig {
        SilenceRemovalConfig::default()
            .with_threshold_db(self.silence_threshold_db)
            .with_min_duration(self.silence_min_duration)
    }

    pub fn face_config(&self) -> FaceCropConfig {
        let config = FaceCropConfig::default().with_sample_count(self.face_sample_count);
        match &self.face_model_path {
            Some(path) => config.with_model_path(path),
            None => config,
        }
    }
}

fn parse_opt<T>(key: &str, value: Option<String>) -> WorkerResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| WorkerError::config_error(format!("{}={:?}: {}", key, v, e)))
        })
        .transpose()
}
