//! JSON-file metadata store.
//!
//! Each record lives at `<dir>/<video-id>.json`. Rewrites go through a
//! sibling temp file and a rename, so a reader sees either the old or the
//! new record. Read-modify-write cycles on the same record are serialized
//! with a per-record async mutex, dropped once no caller holds it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;
use vedit_models::{ProcessingDetails, VideoId, VideoRecord, VideoStatus};

use crate::error::{StoreError, StoreResult};
use crate::metrics;
use crate::store::{apply_progress, apply_status, MetadataStore};

/// Metadata store backed by one JSON file per video.
#[derive(Debug, Default)]
pub struct JsonFileStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JsonFileStore {
    /// Create a store reading and writing records in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `video_id`.
    pub fn record_path(&self, video_id: &VideoId) -> StoreResult<PathBuf> {
        validate_id(video_id)?;
        Ok(self.dir.join(format!("{}.json", video_id)))
    }

    /// Store a new record, replacing any existing one.
    pub async fn create(&self, record: &VideoRecord) -> StoreResult<()> {
        let lock = self.lock_for(&record.video_id).await;
        let guard = lock.lock().await;

        let result = async {
            fs::create_dir_all(&self.dir).await?;
            self.write_record(record).await
        }
        .await;

        drop(guard);
        self.release_lock(&record.video_id, lock).await;
        result
    }

    async fn lock_for(&self, video_id: &VideoId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(video_id.as_str().to_string())
            .or_default()
            .clone()
    }

    /// Forget the lock for `video_id` unless another caller holds or awaits it.
    async fn release_lock(&self, video_id: &VideoId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // The map's handle plus ours
        if Arc::strong_count(&lock) == 2 {
            locks.remove(video_id.as_str());
        }
    }

    async fn read_record(&self, video_id: &VideoId) -> StoreResult<VideoRecord> {
        let path = self.record_path(video_id)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::not_found(video_id.as_str()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(
                video_id = %video_id,
                path = %path.display(),
                "Metadata file is corrupted: {}",
                e
            );
            StoreError::not_found(video_id.as_str())
        })
    }

    async fn write_record(&self, record: &VideoRecord) -> StoreResult<()> {
        let path = self.record_path(&record.video_id)?;
        let tmp = self.dir.join(format!(
            ".{}.json.{}.tmp",
            record.video_id,
            Uuid::new_v4().simple()
        ));

        let bytes = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, &bytes).await?;

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(video_id = %record.video_id, "Wrote metadata record");
        Ok(())
    }

    /// Read, modify and rewrite one record under its lock.
    async fn update<F>(&self, operation: &'static str, video_id: &VideoId, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut VideoRecord) + Send,
    {
        let started = Instant::now();
        let lock = self.lock_for(video_id).await;
        let guard = lock.lock().await;

        let result = async {
            let mut record = self.read_record(video_id).await?;
            apply(&mut record);
            self.write_record(&record).await
        }
        .await;

        drop(guard);
        self.release_lock(video_id, lock).await;

        metrics::record_write(operation, result.is_ok(), started.elapsed().as_secs_f64());
        result
    }
}

/// Reject ids that would escape the store directory.
fn validate_id(video_id: &VideoId) -> StoreResult<()> {
    let id = video_id.as_str();
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl MetadataStore for JsonFileStore {
    async fn read(&self, video_id: &VideoId) -> StoreResult<VideoRecord> {
        self.read_record(video_id).await
    }

    async fn write_status(
        &self,
        video_id: &VideoId,
        status: VideoStatus,
        processed: bool,
    ) -> StoreResult<()> {
        self.update("write_status", video_id, |record| {
            apply_status(record, status, processed)
        })
        .await
    }

    async fn write_progress(
        &self,
        video_id: &VideoId,
        progress: f64,
        details: &ProcessingDetails,
    ) -> StoreResult<()> {
        self.update("write_progress", video_id, |record| {
            apply_progress(record, progress, details)
        })
        .await
    }
}
