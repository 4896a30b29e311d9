pub mod chunk;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod generator;
pub mod job;
pub mod logging;
pub mod options;
pub mod partition;
pub mod pipeline;
pub mod report;
pub mod worker;

pub use chunk::{chunks, Chunk, Chunks, DEFAULT_CHUNK_SIZE};
pub use config::{load_config, load_jobs, RunConfig};
pub use dispatch::{DispatchConfig, DispatchSummary, Dispatcher, ManifestWriter, PipelineSummary};
pub use error::{
    BatchError, ChunkError, ConfigError, DispatchError, GeneratorError, GeneratorErrorKind,
    ManifestError, PartitionError, Result,
};
pub use generator::{batch_fn, per_job_fn, CommandGenerator, Generator};
pub use job::{Job, JobId, Outcome};
pub use options::Options;
pub use partition::{by_field, partition, Partition, PartitionTable, Partitioning, UnmappedPolicy};
pub use pipeline::{
    run_pipeline, BroadcastProgress, LogProgress, NoopProgress, Pipeline, PipelineRunner,
    ProgressEvent, ProgressReporter,
};
pub use report::{merge, MergedReport, StatusReport};
pub use worker::{CancelHandle, WorkerPool};
