use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, info_span};

use crate::error::DispatchError;
use crate::job::Job;
use crate::options::Options;
use crate::partition::{partition, Partition, PartitionTable};
use crate::pipeline::{NoopProgress, PipelineRunner, ProgressEvent, ProgressReporter};
use crate::worker::{CancelHandle, WorkerPool};

use super::config::DispatchConfig;
use super::manifest::ManifestWriter;
use super::summary::{DispatchSummary, PipelineSummary};

/// Fans pipelines out over a worker pool and streams outcomes into the
/// success and failure manifests.
pub struct Dispatcher {
    config: DispatchConfig,
    options: Arc<Options>,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancelHandle,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, options: Arc<Options>) -> Self {
        Self {
            config,
            options,
            progress: Arc::new(NoopProgress),
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Handle that stops every pool this dispatcher creates, e.g. on Ctrl-C.
    /// Only the operator raises it; a systemic failure stops its own call.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs every partition's pipeline and writes each chunk's outcomes to
    /// `manifests` as the chunk completes.
    ///
    /// A worker pool is created for this call and torn down before it
    /// returns. The first systemic failure cancels the pool and is returned
    /// once the manifests have been flushed.
    pub fn dispatch<S: Write, F: Write>(
        &self,
        manifests: &mut ManifestWriter<S, F>,
        partitions: &[Partition],
    ) -> Result<DispatchSummary, DispatchError> {
        self.config.validate()?;
        let mut summary = DispatchSummary::start();
        self.dispatch_into(&mut summary, manifests, partitions)?;
        Ok(summary)
    }

    /// Partitions `jobs` with the configured unmapped-category policy, then
    /// dispatches the result. Nothing is written when the configuration is
    /// invalid.
    pub fn dispatch_jobs<S, F, C>(
        &self,
        manifests: &mut ManifestWriter<S, F>,
        jobs: &[Job],
        category_of: C,
        table: &PartitionTable,
    ) -> Result<DispatchSummary, DispatchError>
    where
        S: Write,
        F: Write,
        C: Fn(&Job) -> String,
    {
        self.config.validate()?;
        let partitioning = partition(
            jobs,
            category_of,
            table,
            self.config.on_unmapped_category,
        )?;

        let mut summary = DispatchSummary::start();
        for job in &partitioning.unmapped {
            manifests.record_failure(&job.id, &[job.failure_message()])?;
            self.progress.report(ProgressEvent::Unmapped {
                job: job.id.to_string(),
                category: job.category.clone(),
            });
            summary.unmapped.push(job.id.clone());
        }

        self.dispatch_into(&mut summary, manifests, &partitioning.partitions)?;
        Ok(summary)
    }

    fn dispatch_into<S: Write, F: Write>(
        &self,
        summary: &mut DispatchSummary,
        manifests: &mut ManifestWriter<S, F>,
        partitions: &[Partition],
    ) -> Result<(), DispatchError> {
        let _span = info_span!(
            "dispatch",
            run_id = %summary.run_id,
            partitions = partitions.len(),
            workers = self.config.worker_count,
        )
        .entered();

        let pool = WorkerPool::with_cancel(
            Arc::clone(&self.options),
            self.config.worker_count,
            self.config.chunk_size,
            self.cancel.clone(),
        )?;
        let runner = PipelineRunner::new(&pool).with_progress(self.progress.as_ref());

        let result: Result<(), DispatchError> = partitions.iter().try_for_each(|part| {
            info!(
                category = %part.category,
                pipeline = %part.pipeline.name(),
                jobs = part.ids.len(),
                "dispatching partition"
            );
            let report = runner.run(&part.pipeline, &part.ids, &mut |chunk, report| {
                manifests
                    .record_chunk(chunk, report)
                    .map_err(DispatchError::from)
            })?;
            summary.pipelines.push(PipelineSummary {
                category: part.category.clone(),
                pipeline: part.pipeline.name().to_string(),
                stages: part.pipeline.len(),
                jobs: part.ids.len(),
                report,
            });
            Ok(())
        });

        drop(runner);
        pool.wait();

        // Whatever finished before a failure stays on record.
        let flushed = manifests.flush();
        summary.success_lines = manifests.success_lines();
        summary.failure_lines = manifests.failure_lines();
        summary.finished_at = Utc::now();

        match (result, flushed) {
            (Err(e), flushed) => {
                if let Err(flush_err) = flushed {
                    error!("Failed to flush manifests after dispatch error: {}", flush_err);
                }
                error!("Dispatch {} aborted: {}", summary.run_id, e);
                Err(e)
            }
            (Ok(()), Err(flush_err)) => Err(flush_err.into()),
            (Ok(()), Ok(())) => {
                info!(
                    successes = summary.success_lines,
                    failures = summary.failure_lines,
                    "dispatch finished"
                );
                Ok(())
            }
        }
    }
}
