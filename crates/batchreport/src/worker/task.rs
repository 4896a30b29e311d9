use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::chunk::Chunk;
use crate::error::{GeneratorError, GeneratorErrorKind};
use crate::generator::Generator;
use crate::options::Options;
use crate::report::StatusReport;

/// A chunk bound to the generator that should process it.
pub struct ChunkTask {
    pub chunk: Chunk,
    pub generator: Arc<dyn Generator>,
}

#[derive(Debug)]
pub enum ChunkOutcome {
    Completed(StatusReport),
    Failed(GeneratorError),
    /// The pool was cancelled before this chunk started.
    Skipped,
}

#[derive(Debug)]
pub struct ChunkResult {
    pub chunk: Chunk,
    pub generator: String,
    pub outcome: ChunkOutcome,
}

impl ChunkTask {
    /// Runs the generator on this chunk, turning a panic into a systemic
    /// `GeneratorError` so the worker thread survives it.
    pub fn run(self, options: &Options) -> ChunkResult {
        let generator = Arc::clone(&self.generator);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| {
            generator.generate(options, &self.chunk.ids)
        })) {
            Ok(Ok(report)) => ChunkOutcome::Completed(report),
            Ok(Err(err)) => ChunkOutcome::Failed(err),
            Err(payload) => ChunkOutcome::Failed(GeneratorError::new(
                GeneratorErrorKind::Panic,
                panic_message(payload.as_ref()),
            )),
        };

        ChunkResult {
            chunk: self.chunk,
            generator: generator.name().to_string(),
            outcome,
        }
    }

    pub fn skip(self) -> ChunkResult {
        ChunkResult {
            generator: self.generator.name().to_string(),
            chunk: self.chunk,
            outcome: ChunkOutcome::Skipped,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("generator panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("generator panicked: {}", message)
    } else {
        "generator panicked".to_string()
    }
}
