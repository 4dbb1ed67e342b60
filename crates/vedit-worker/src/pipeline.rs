//! Pipeline planning and execution.
//!
//! A run is planned once from the record's processing options and then
//! executed step by step. Each step reads the previous step's output; only
//! the last step writes the final output path, everything before it writes
//! intermediates owned by an [`ArtifactSet`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use vedit_media::fs_utils::{extension_of, remove_if_exists};
use vedit_media::{
    apply_operations, auto_crop_face, copy_file, remove_silence, ArtifactSet, FaceCropConfig,
    FfmpegRunner, MediaResult, ProgressReporter, ProgressSink, SilenceRemovalConfig,
};
use vedit_models::{EditOperation, ProcessingOptions};

use crate::config::WorkerConfig;
use crate::metrics;

/// Step name reported when nothing was requested and the source is copied.
pub const COPY_STEP_NAME: &str = "Copy Original";

/// One stage of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStep {
    /// Apply discrete edit operations in order
    Edit(Vec<EditOperation>),
    /// Cut silent stretches
    SilenceRemoval,
    /// Crop to 9:16 around the speaker's face
    FaceCrop,
}

impl PipelineStep {
    /// Human-readable name persisted in processing details.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStep::Edit(_) => "Natural Language Editing",
            PipelineStep::SilenceRemoval => "Silence Removal",
            PipelineStep::FaceCrop => "Face Auto-Crop",
        }
    }

    /// Label used for metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            PipelineStep::Edit(_) => "edit",
            PipelineStep::SilenceRemoval => "silence_removal",
            PipelineStep::FaceCrop => "face_crop",
        }
    }
}

/// Ordered, immutable list of steps for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelinePlan {
    steps: Vec<PipelineStep>,
}

impl PipelinePlan {
    /// Plan the steps `options` ask for: edits, then silence removal, then
    /// face crop.
    pub fn from_options(options: &ProcessingOptions) -> Self {
        let mut steps = Vec::with_capacity(3);
        if !options.edits().is_empty() {
            steps.push(PipelineStep::Edit(options.edits().to_vec()));
        }
        if options.remove_silence {
            steps.push(PipelineStep::SilenceRemoval);
        }
        if options.auto_crop_face {
            steps.push(PipelineStep::FaceCrop);
        }
        Self { steps }
    }

    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(PipelineStep::name).collect()
    }
}

/// Executes a single pipeline step.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn execute(
        &self,
        step: &PipelineStep,
        input: &Path,
        output: &Path,
        progress: &ProgressReporter,
    ) -> MediaResult<()>;
}

/// Step runner backed by the FFmpeg media components.
#[derive(Debug, Clone, Default)]
pub struct FfmpegStepRunner {
    runner: FfmpegRunner,
    silence: SilenceRemovalConfig,
    face: FaceCropConfig,
}

impl FfmpegStepRunner {
    pub fn new(runner: FfmpegRunner, silence: SilenceRemovalConfig, face: FaceCropConfig) -> Self {
        Self {
            runner,
            silence,
            face,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            config.ffmpeg_runner(),
            config.silence_config(),
            config.face_config(),
        )
    }
}

#[async_trait]
impl StepRunner for FfmpegStepRunner {
    async fn execute(
        &self,
        step: &PipelineStep,
        input: &Path,
        output: &Path,
        progress: &ProgressReporter,
    ) -> MediaResult<()> {
        match step {
            PipelineStep::Edit(ops) => {
                apply_operations(input, output, ops, &self.runner, progress).await
            }
            PipelineStep::SilenceRemoval => {
                remove_silence(input, output, &self.silence, &self.runner, progress).await
            }
            PipelineStep::FaceCrop => {
                auto_crop_face(input, output, &self.face, &self.runner, progress).await
            }
        }
    }
}

/// A planned step bound to its files and progress slot.
#[derive(Debug)]
struct StepInvocation<'a> {
    step: &'a PipelineStep,
    input: PathBuf,
    output: PathBuf,
    progress: ProgressReporter,
}

/// Runs a [`PipelinePlan`] over one source file.
#[derive(Clone)]
pub struct PipelineExecutor {
    runner: Arc<dyn StepRunner>,
    work_dir: PathBuf,
}

impl PipelineExecutor {
    /// Create an executor placing intermediates in `work_dir`.
    pub fn new(runner: Arc<dyn StepRunner>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            work_dir: work_dir.into(),
        }
    }

    /// Run `plan` from `input` to `output`, publishing progress to `sink`.
    ///
    /// Intermediates are removed on every exit path. When a step fails, a
    /// partially written `output` is removed as well.
    pub async fn run(
        &self,
        plan: &PipelinePlan,
        input: &Path,
        output: &Path,
        sink: ProgressSink,
    ) -> MediaResult<()> {
        if plan.is_empty() {
            info!("No processing requested, copying original");
            copy_file(input, output).await?;
            ProgressReporter::new(0, 1, COPY_STEP_NAME, sink).report(100.0);
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let mut artifacts = ArtifactSet::new(&self.work_dir);
        let invocations = self.plan_invocations(plan, input, output, &mut artifacts, &sink);

        info!(
            steps = ?plan.step_names(),
            run_id = artifacts.run_id(),
            intermediates = artifacts.paths().len(),
            "Running pipeline"
        );

        let result = self.execute_all(&invocations).await;

        if result.is_err() {
            if let Err(e) = remove_if_exists(output).await {
                warn!("Failed to remove partial output {}: {}", output.display(), e);
            }
        }

        // Intermediates go away here, whatever the outcome
        drop(artifacts);
        result
    }

    fn plan_invocations<'a>(
        &self,
        plan: &'a PipelinePlan,
        input: &Path,
        output: &Path,
        artifacts: &mut ArtifactSet,
        sink: &ProgressSink,
    ) -> Vec<StepInvocation<'a>> {
        let total = plan.len();
        let extension = extension_of(input);
        let mut current_input = input.to_path_buf();

        plan.steps()
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let step_output = if i + 1 == total {
                    output.to_path_buf()
                } else {
                    artifacts.allocate(i, &extension)
                };
                StepInvocation {
                    step,
                    input: std::mem::replace(&mut current_input, step_output.clone()),
                    output: step_output,
                    progress: ProgressReporter::new(i, total, step.name(), sink.clone()),
                }
            })
            .collect()
    }

    async fn execute_all(&self, invocations: &[StepInvocation<'_>]) -> MediaResult<()> {
        for invocation in invocations {
            let step = invocation.step;
            debug!(
                step = step.name(),
                input = %invocation.input.display(),
                output = %invocation.output.display(),
                "Starting pipeline step"
            );

            invocation.progress.report(0.0);
            let started = Instant::now();
            let result = self
                .runner
                .execute(step, &invocation.input, &invocation.output, &invocation.progress)
                .await;
            metrics::record_step(
                step.metric_label(),
                result.is_ok(),
                started.elapsed().as_secs_f64(),
            );

            match result {
                Ok(()) => invocation.progress.report(100.0),
                Err(e) => {
                    warn!(step = step.name(), "Pipeline step failed: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}
