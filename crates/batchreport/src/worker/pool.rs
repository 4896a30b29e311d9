use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::chunk::chunks;
use crate::error::DispatchError;
use crate::job::JobId;
use crate::options::Options;
use crate::pipeline::runner::{reconcile_report, ChunkSink, StageExecutor, StageRequest};
use crate::report::StatusReport;
use crate::worker::task::{ChunkOutcome, ChunkResult, ChunkTask};

/// Shared flag that stops a pool from starting further chunks.
///
/// Only the holder decides when to raise it; a pool never raises the
/// handle it was given, so the handle outlives one failed dispatch.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Fixed-size pool of worker threads executing chunk tasks.
///
/// Workers only return results over a channel; everything that writes
/// output stays on the thread driving the pool.
pub struct WorkerPool {
    task_sender: Option<Sender<ChunkTask>>,
    result_receiver: Receiver<ChunkResult>,
    workers: Vec<JoinHandle<()>>,
    /// Raised by the caller, e.g. on Ctrl-C.
    cancel: CancelHandle,
    /// Raised by the pool itself after a systemic failure; dies with the pool.
    abort: CancelHandle,
    chunk_size: usize,
}

impl WorkerPool {
    pub fn new(
        options: Arc<Options>,
        worker_count: usize,
        chunk_size: usize,
    ) -> Result<Self, DispatchError> {
        Self::with_cancel(options, worker_count, chunk_size, CancelHandle::new())
    }

    pub fn with_cancel(
        options: Arc<Options>,
        worker_count: usize,
        chunk_size: usize,
        cancel: CancelHandle,
    ) -> Result<Self, DispatchError> {
        if worker_count == 0 {
            return Err(DispatchError::InvalidConfig(
                "worker_count must be > 0".to_string(),
            ));
        }
        if chunk_size == 0 {
            return Err(DispatchError::InvalidConfig(
                "chunk_size must be > 0".to_string(),
            ));
        }

        let (task_sender, task_receiver) = bounded::<ChunkTask>(worker_count * 2);
        // Unbounded so a worker never blocks on a result while the driving
        // thread is still blocked submitting tasks.
        let (result_sender, result_receiver) = unbounded::<ChunkResult>();

        let abort = CancelHandle::new();
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let task_rx = task_receiver.clone();
            let result_tx = result_sender.clone();
            let worker_options = Arc::clone(&options);
            let worker_stop = [cancel.clone(), abort.clone()];

            let handle = thread::Builder::new()
                .name(format!("batchreport-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, task_rx, result_tx, worker_options, worker_stop);
                })
                .map_err(|e| DispatchError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers (chunk size {})", worker_count, chunk_size);

        Ok(Self {
            task_sender: Some(task_sender),
            result_receiver,
            workers,
            cancel,
            abort,
            chunk_size,
        })
    }

    /// Stops this pool without touching the caller's handle.
    pub fn cancel(&self) {
        info!("Cancelling worker pool...");
        self.abort.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.abort.is_cancelled()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the task queue and joins every worker.
    pub fn wait(mut self) {
        self.join_workers();
    }

    fn join_workers(&mut self) {
        // Dropping the sender lets workers drain the queue and exit
        drop(self.task_sender.take());

        for (i, worker) in std::mem::take(&mut self.workers).into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }
    }

    fn submit(&self, task: ChunkTask) -> Result<(), DispatchError> {
        self.task_sender
            .as_ref()
            .ok_or(DispatchError::ChannelClosed)?
            .send(task)
            .map_err(|_| DispatchError::ChannelClosed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.join_workers();
            info!("All workers have stopped");
        }
    }
}

impl StageExecutor for WorkerPool {
    fn execute_stage(
        &self,
        request: StageRequest<'_>,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<StatusReport, DispatchError> {
        if self.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let mut submitted = 0usize;
        for chunk in chunks(request.ids, self.chunk_size)? {
            self.submit(ChunkTask {
                chunk,
                generator: Arc::clone(request.generator),
            })?;
            submitted += 1;
        }
        debug!(
            "Submitted {} chunk(s) of '{}' for pipeline '{}'",
            submitted,
            request.generator.name(),
            request.pipeline
        );

        let mut stage_report = StatusReport::with_capacity(request.ids.len());
        let mut first_error: Option<DispatchError> = None;
        let mut skipped = 0usize;

        // Drain every submitted chunk, even after a failure, so no stale
        // result leaks into the next stage.
        for _ in 0..submitted {
            let result = self
                .result_receiver
                .recv()
                .map_err(|_| DispatchError::ChannelClosed)?;

            match result.outcome {
                ChunkOutcome::Completed(report) => {
                    let report = reconcile_report(&result.generator, &result.chunk, report);
                    if first_error.is_none() {
                        if let Err(e) = on_chunk(&result.chunk, &report) {
                            self.abort.cancel();
                            first_error = Some(e);
                        }
                    }
                    stage_report.extend(report);
                }
                ChunkOutcome::Failed(source) => {
                    error!(
                        "Generator '{}' failed on chunk {} of pipeline '{}': {}",
                        result.generator,
                        result.chunk.index,
                        request.pipeline,
                        source.full_context()
                    );
                    self.abort.cancel();
                    if first_error.is_none() {
                        first_error = Some(DispatchError::Systemic {
                            generator: result.generator,
                            pipeline: request.pipeline.to_string(),
                            chunk_index: result.chunk.index,
                            first_job: result
                                .chunk
                                .first_id()
                                .cloned()
                                .unwrap_or_else(|| JobId::from("")),
                            source,
                        });
                    }
                }
                ChunkOutcome::Skipped => skipped += 1,
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        if skipped > 0 {
            warn!("{} chunk(s) skipped after cancellation", skipped);
            return Err(DispatchError::Cancelled);
        }
        Ok(stage_report)
    }
}

fn run_worker(
    worker_id: usize,
    task_receiver: Receiver<ChunkTask>,
    result_sender: Sender<ChunkResult>,
    options: Arc<Options>,
    stop: [CancelHandle; 2],
) {
    debug!("Worker {} started", worker_id);

    loop {
        match task_receiver.recv() {
            Ok(task) => {
                let result = if stop.iter().any(CancelHandle::is_cancelled) {
                    task.skip()
                } else {
                    debug!(
                        "Worker {} processing chunk {} with '{}'",
                        worker_id,
                        task.chunk.index,
                        task.generator.name()
                    );
                    task.run(&options)
                };

                if let Err(e) = result_sender.send(result) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(_) => {
                debug!("Worker {} task channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
