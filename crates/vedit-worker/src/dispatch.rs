//! Background dispatch of pipeline runs.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};
use vedit_models::VideoId;

use crate::error::WorkerResult;
use crate::lifecycle::ProcessingLifecycle;

/// Spawns one independent lifecycle run per video.
///
/// Runs for the same video must not overlap; the dispatcher does not
/// deduplicate them.
#[derive(Clone)]
pub struct RunDispatcher {
    lifecycle: Arc<ProcessingLifecycle>,
}

impl RunDispatcher {
    pub fn new(lifecycle: Arc<ProcessingLifecycle>) -> Self {
        Self { lifecycle }
    }

    /// Start processing `video_id` in the background.
    ///
    /// The handle resolves to the run's outcome; dropping it leaves the run
    /// going.
    pub fn dispatch(&self, video_id: VideoId) -> JoinHandle<WorkerResult<()>> {
        let lifecycle = Arc::clone(&self.lifecycle);
        info!(video_id = %video_id, "Dispatching pipeline run");

        tokio::spawn(async move {
            let result = lifecycle.run(&video_id).await;
            if let Err(e) = &result {
                error!(video_id = %video_id, "Background run failed: {}", e);
            }
            result
        })
    }
}
