use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events emitted while pipelines are dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    StageStarted {
        pipeline: String,
        stage: String,
        jobs: usize,
    },
    ChunkFinished {
        pipeline: String,
        stage: String,
        chunk_index: usize,
        succeeded: usize,
        failed: usize,
    },
    StageFinished {
        pipeline: String,
        stage: String,
        failed: usize,
    },
    Unmapped {
        job: String,
        category: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests and library callers that don't care.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes progress to the tracing log.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted {
                pipeline,
                stage,
                jobs,
            } => info!("[{}] stage '{}' started for {} job(s)", pipeline, stage, jobs),
            ProgressEvent::ChunkFinished {
                pipeline,
                stage,
                chunk_index,
                succeeded,
                failed,
            } => debug!(
                "[{}] stage '{}' chunk {} done: {} ok, {} failed",
                pipeline, stage, chunk_index, succeeded, failed
            ),
            ProgressEvent::StageFinished {
                pipeline,
                stage,
                failed,
            } => info!("[{}] stage '{}' finished, {} failure(s)", pipeline, stage, failed),
            ProgressEvent::Unmapped { job, category } => {
                warn!("job '{}' has no pipeline for category '{}'", job, category)
            }
        }
    }
}

/// Forwards events to a broadcast channel for live subscribers.
#[derive(Clone)]
pub struct BroadcastProgress {
    sender: broadcast::Sender<ProgressEvent>,
}

impl BroadcastProgress {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastProgress {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }
}
