//! Processing lifecycle of one video.
//!
//! ```text
//!   uploaded ──► processing ──┬──► completed   (progress 100, processed)
//!                             └──► error       (original error re-raised)
//! ```
//!
//! Progress updates from the pipeline travel over a channel to a single
//! writer task, so the record is rewritten in order and never regresses.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, warn, Instrument};
use vedit_media::ProgressUpdate;
use vedit_models::{ProcessingDetails, VideoId, VideoRecord, VideoStatus};
use vedit_store::MetadataStore;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::pipeline::{FfmpegStepRunner, PipelineExecutor, PipelinePlan};

/// Drives one pipeline run per call and keeps the video record in step.
#[derive(Clone)]
pub struct ProcessingLifecycle {
    config: WorkerConfig,
    store: Arc<dyn MetadataStore>,
    executor: PipelineExecutor,
}

impl ProcessingLifecycle {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn MetadataStore>,
        executor: PipelineExecutor,
    ) -> Self {
        Self {
            config,
            store,
            executor,
        }
    }

    /// Lifecycle running the FFmpeg-backed steps configured in `config`.
    pub fn from_config(config: WorkerConfig, store: Arc<dyn MetadataStore>) -> Self {
        let runner = Arc::new(FfmpegStepRunner::from_config(&config));
        let executor = PipelineExecutor::new(runner, config.work_dir.clone());
        Self::new(config, store, executor)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Process `video_id` from its stored options to a finished output.
    ///
    /// A missing or unreadable record fails before the status is touched.
    /// Once the run has started, any failure marks the record `error` and
    /// is returned unchanged.
    pub async fn run(&self, video_id: &VideoId) -> WorkerResult<()> {
        let logger = RunLogger::new(video_id, "process_video");
        let span = logger.create_span();

        async {
            let started = Instant::now();
            logger.log_start("processing video");

            let result = self.run_inner(video_id, &logger).await;
            let elapsed = started.elapsed().as_secs_f64();
            metrics::record_run(elapsed, result.as_ref().err().map(WorkerError::kind));

            match &result {
                Ok(()) => logger.log_completion(&format!("finished in {:.2}s", elapsed)),
                Err(e) => logger.log_error(&format!("failed after {:.2}s: {}", elapsed, e)),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(&self, video_id: &VideoId, logger: &RunLogger) -> WorkerResult<()> {
        let record = self.store.read(video_id).await?;
        let input = self.config.input_path(&record);
        let output = self.config.output_path(&record);

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.store
            .write_status(video_id, VideoStatus::Processing, false)
            .await?;

        let outcome = async {
            let last = self.execute(video_id, &record, &input, &output, logger).await?;
            self.finalize(video_id, last, &output).await
        }
        .await;

        if let Err(e) = &outcome {
            if let Err(store_err) = self
                .store
                .write_status(video_id, VideoStatus::Error, false)
                .await
            {
                logger.log_warning(&format!(
                    "could not record error status after {} failure: {}",
                    e.kind(),
                    store_err
                ));
            }
        }
        outcome
    }

    /// Record the finished run; the output is removed if that fails.
    async fn finalize(
        &self,
        video_id: &VideoId,
        last: ProcessingDetails,
        output: &Path,
    ) -> WorkerResult<()> {
        let details = ProcessingDetails {
            current_step_progress: 100.0,
            ..last
        };
        let written = async {
            self.store.write_progress(video_id, 100.0, &details).await?;
            self.store
                .write_status(video_id, VideoStatus::Completed, true)
                .await
        }
        .await;

        if written.is_err() {
            if let Err(e) = tokio::fs::remove_file(output).await {
                warn!(path = %output.display(), "Failed to remove output: {}", e);
            }
        }
        written.map_err(WorkerError::from)
    }

    /// Run the pipeline and return the last persisted step details.
    async fn execute(
        &self,
        video_id: &VideoId,
        record: &VideoRecord,
        input: &Path,
        output: &Path,
        logger: &RunLogger,
    ) -> WorkerResult<ProcessingDetails> {
        let plan = PipelinePlan::from_options(&record.processing_options);
        logger.log_progress(&format!("planned steps {:?}", plan.step_names()));

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(
            persist_progress(self.store.clone(), video_id.clone(), rx).in_current_span(),
        );

        // The executor owns every sender; the writer drains and exits once it returns
        let result = self.executor.run(&plan, input, output, tx).await;
        let written = writer.await;

        result?;
        written.map_err(|e| WorkerError::run_aborted(format!("progress writer failed: {}", e)))
    }
}

/// Persist progress updates in arrival order, skipping any that would move
/// overall progress backwards.
async fn persist_progress(
    store: Arc<dyn MetadataStore>,
    video_id: VideoId,
    mut updates: mpsc::UnboundedReceiver<ProgressUpdate>,
) -> ProcessingDetails {
    let mut high_water = f64::NEG_INFINITY;
    let mut last = ProcessingDetails::default();

    while let Some(update) = updates.recv().await {
        if update.overall < high_water {
            debug!(
                overall = update.overall,
                high_water, "Dropping regressing progress update"
            );
            continue;
        }
        high_water = update.overall;

        let details = ProcessingDetails {
            current_step: update.step_name,
            total_steps: update.total_steps as u32,
            current_step_progress: update.step_progress,
        };
        if let Err(e) = store.write_progress(&video_id, update.overall, &details).await {
            metrics::record_progress_write_failure();
            warn!(video_id = %video_id, "Failed to persist progress: {}", e);
        }
        last = details;
    }

    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use vedit_store::{StoreError, StoreResult};

    /// Store that records every write and keeps one record in memory.
    #[derive(Default)]
    struct MemoryStore {
        record: Mutex<Option<VideoRecord>>,
        progress: Mutex<Vec<f64>>,
    }

    #[async_trait]
    impl MetadataStore for MemoryStore {
        async fn read(&self, video_id: &VideoId) -> StoreResult<VideoRecord> {
            self.record
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| StoreError::not_found(video_id.as_str()))
        }

        async fn write_status(
            &self,
            _video_id: &VideoId,
            status: VideoStatus,
            processed: bool,
        ) -> StoreResult<()> {
            if let Some(record) = self.record.lock().unwrap().as_mut() {
                vedit_store::apply_status(record, status, processed);
            }
            Ok(())
        }

        async fn write_progress(
            &self,
            _video_id: &VideoId,
            progress: f64,
            details: &ProcessingDetails,
        ) -> StoreResult<()> {
            self.progress.lock().unwrap().push(progress);
            if let Some(record) = self.record.lock().unwrap().as_mut() {
                vedit_store::apply_progress(record, progress, details);
            }
            Ok(())
        }
    }

    fn update(overall: f64) -> ProgressUpdate {
        ProgressUpdate {
            overall,
            step_name: "Silence Removal".to_string(),
            step_index: 0,
            total_steps: 1,
            step_progress: overall,
        }
    }

    #[tokio::test]
    async fn test_writer_drops_regressions() {
        let store = Arc::new(MemoryStore::default());
        *store.record.lock().unwrap() = Some(VideoRecord::new(VideoId::from("v"), "mp4"));
        let (tx, rx) = mpsc::unbounded_channel();

        for overall in [10.0, 30.0, 20.0, 30.0, 90.0] {
            tx.send(update(overall)).unwrap();
        }
        drop(tx);

        let last = persist_progress(store.clone(), VideoId::from("v"), rx).await;
        assert_eq!(*store.progress.lock().unwrap(), vec![10.0, 30.0, 30.0, 90.0]);
        assert_eq!(last.current_step, "Silence Removal");
        assert_eq!(last.current_step_progress, 90.0);
    }

    #[tokio::test]
    async fn test_missing_record_fails_without_status_write() {
        let store = Arc::new(MemoryStore::default());
        let lifecycle = ProcessingLifecycle::from_config(WorkerConfig::default(), store.clone());

        let err = lifecycle.run(&VideoId::from("absent")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.progress.lock().unwrap().is_empty());
    }
}
