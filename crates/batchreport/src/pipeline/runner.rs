use std::sync::Arc;

use tracing::{info_span, warn};

use crate::chunk::{chunks, Chunk};
use crate::error::DispatchError;
use crate::generator::Generator;
use crate::job::{JobId, Outcome};
use crate::options::Options;
use crate::report::{MergedReport, StatusReport};

use super::progress::{NoopProgress, ProgressEvent, ProgressReporter};
use super::Pipeline;

/// One generator applied to one id subset.
pub struct StageRequest<'a> {
    pub pipeline: &'a str,
    pub generator: &'a Arc<dyn Generator>,
    pub ids: &'a [JobId],
}

/// Callback invoked with every finished chunk and its reconciled report.
pub type ChunkSink<'a> = dyn FnMut(&Chunk, &StatusReport) -> Result<(), DispatchError> + 'a;

/// Runs one stage to completion: chunks the ids, executes every chunk and
/// hands each chunk's report to `on_chunk` as it arrives.
///
/// Returns the union of the chunk reports, or the first systemic failure
/// once every submitted chunk has been accounted for.
pub trait StageExecutor {
    fn execute_stage(
        &self,
        request: StageRequest<'_>,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<StatusReport, DispatchError>;
}

/// Executes chunks one after another on the calling thread.
pub struct InlineExecutor {
    options: Arc<Options>,
    chunk_size: usize,
}

impl InlineExecutor {
    pub fn new(options: Arc<Options>, chunk_size: usize) -> Self {
        Self {
            options,
            chunk_size,
        }
    }
}

impl StageExecutor for InlineExecutor {
    fn execute_stage(
        &self,
        request: StageRequest<'_>,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<StatusReport, DispatchError> {
        let mut stage_report = StatusReport::with_capacity(request.ids.len());
        for chunk in chunks(request.ids, self.chunk_size)? {
            let report = request
                .generator
                .generate(&self.options, &chunk.ids)
                .map_err(|source| DispatchError::Systemic {
                    generator: request.generator.name().to_string(),
                    pipeline: request.pipeline.to_string(),
                    chunk_index: chunk.index,
                    first_job: chunk.first_id().cloned().unwrap_or_else(|| JobId::from("")),
                    source,
                })?;
            let report = reconcile_report(request.generator.name(), &chunk, report);
            on_chunk(&chunk, &report)?;
            stage_report.extend(report);
        }
        Ok(stage_report)
    }
}

/// Runs every stage of a pipeline through an executor and merges the
/// per-stage reports in stage order.
pub struct PipelineRunner<'a, E: StageExecutor + ?Sized> {
    executor: &'a E,
    progress: &'a dyn ProgressReporter,
}

impl<'a, E: StageExecutor + ?Sized> PipelineRunner<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            progress: &NoopProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Every stage runs for every id, whatever earlier stages reported.
    pub fn run(
        &self,
        pipeline: &Pipeline,
        ids: &[JobId],
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<MergedReport, DispatchError> {
        let _pipeline_span =
            info_span!("pipeline", pipeline = %pipeline.name(), jobs = ids.len()).entered();
        let mut merged = MergedReport::new();

        for generator in pipeline.stages() {
            let _stage = info_span!("stage", generator = %generator.name()).entered();
            self.progress.report(ProgressEvent::StageStarted {
                pipeline: pipeline.name().to_string(),
                stage: generator.name().to_string(),
                jobs: ids.len(),
            });

            let progress = self.progress;
            let mut forward = |chunk: &Chunk,
                               report: &StatusReport|
             -> Result<(), DispatchError> {
                on_chunk(chunk, report)?;
                let failed = report.failure_count();
                progress.report(ProgressEvent::ChunkFinished {
                    pipeline: pipeline.name().to_string(),
                    stage: generator.name().to_string(),
                    chunk_index: chunk.index,
                    succeeded: report.len() - failed,
                    failed,
                });
                Ok(())
            };

            let report = self.executor.execute_stage(
                StageRequest {
                    pipeline: pipeline.name(),
                    generator,
                    ids,
                },
                &mut forward,
            )?;

            self.progress.report(ProgressEvent::StageFinished {
                pipeline: pipeline.name().to_string(),
                stage: generator.name().to_string(),
                failed: report.failure_count(),
            });
            merged.absorb(&report);
        }

        Ok(merged)
    }
}

/// Runs a pipeline on the calling thread without writing any manifest.
pub fn run_pipeline(
    pipeline: &Pipeline,
    options: Arc<Options>,
    ids: &[JobId],
    chunk_size: usize,
) -> Result<MergedReport, DispatchError> {
    let executor = InlineExecutor::new(options, chunk_size);
    PipelineRunner::new(&executor).run(pipeline, ids, &mut |_, _| Ok(()))
}

/// Aligns a generator's report with the chunk it was given: ids the
/// generator skipped become failures, ids it invented are dropped.
pub(crate) fn reconcile_report(
    generator: &str,
    chunk: &Chunk,
    mut report: StatusReport,
) -> StatusReport {
    let mut reconciled = StatusReport::with_capacity(chunk.len());
    for id in &chunk.ids {
        match report.remove(id) {
            Some(outcome) => reconciled.insert(id.clone(), outcome),
            None => {
                warn!(job_id = %id, generator, "generator reported no outcome");
                reconciled.insert(
                    id.clone(),
                    Outcome::failure(format!("generator '{}' reported no outcome", generator)),
                );
            }
        }
    }
    if !report.is_empty() {
        warn!(
            generator,
            extra = report.len(),
            "generator reported outcomes for jobs outside its chunk"
        );
    }
    reconciled
}
