pub mod pool;
pub mod task;

pub use pool::{CancelHandle, WorkerPool};
pub use task::{ChunkOutcome, ChunkResult, ChunkTask};
