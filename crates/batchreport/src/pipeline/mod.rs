pub mod progress;
pub mod runner;

use std::sync::Arc;

use crate::generator::Generator;

pub use progress::{BroadcastProgress, LogProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::{run_pipeline, InlineExecutor, PipelineRunner, StageExecutor, StageRequest};

/// Ordered generator stages run against the same jobs.
///
/// Stages do not consume each other's output; each sees only the shared
/// `Options` and the job ids.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<dyn Generator>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, generator: Arc<dyn Generator>) -> Self {
        self.stages.push(generator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Arc<dyn Generator>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
