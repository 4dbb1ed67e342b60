//! Video edit pipeline worker.
//!
//! This crate provides:
//! - Pipeline planning and step execution
//! - The processing lifecycle around each run
//! - Background dispatch of runs
//! - Configuration, structured logging and metrics

pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::WorkerConfig;
pub use dispatch::RunDispatcher;
pub use error::{WorkerError, WorkerResult};
pub use lifecycle::ProcessingLifecycle;
pub use logging::RunLogger;
pub use pipeline::{
    FfmpegStepRunner, PipelineExecutor, PipelinePlan, PipelineStep, StepRunner, COPY_STEP_NAME,
};
