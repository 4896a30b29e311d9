use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::job::JobId;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Partition error: {0}")]
    Partition(#[from] PartitionError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Failed to write run summary '{path}': {source}")]
    WriteSummary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BatchError {
    /// True when the run stopped because it was asked to, not because
    /// something broke.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BatchError::Dispatch(DispatchError::Cancelled))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid stage '{stage}' in pipeline '{pipeline}': {reason}")]
    InvalidStage {
        pipeline: String,
        stage: String,
        reason: String,
    },

    #[error("Failed to read job list '{path}': {source}")]
    ReadJobs {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Job list '{path}' has no column named '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Duplicate job id '{0}' in job list")]
    DuplicateJob(JobId),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Chunk size must be positive, got {0}")]
    InvalidSize(usize),
}

/// Classifies unrecoverable generator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorErrorKind {
    /// Something the whole chunk depends on is missing or unusable.
    Setup,
    Io,
    Template,
    /// The generator panicked inside a worker.
    Panic,
}

impl fmt::Display for GeneratorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeneratorErrorKind::Setup => "setup",
            GeneratorErrorKind::Io => "io",
            GeneratorErrorKind::Template => "template",
            GeneratorErrorKind::Panic => "panic",
        };
        f.write_str(name)
    }
}

/// A systemic failure raised by a generator, as opposed to a per-job
/// failure reported in-band through its `StatusReport`.
#[derive(Error, Debug)]
#[error("{kind} error: {message}")]
pub struct GeneratorError {
    pub kind: GeneratorErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GeneratorError {
    pub fn new(kind: GeneratorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::new(GeneratorErrorKind::Setup, message)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Message followed by every cause in the source chain, joined by ": ".
    pub fn full_context(&self) -> String {
        let mut text = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            text.push_str(": ");
            text.push_str(&err.to_string());
            cause = err.source();
        }
        text
    }
}

impl From<std::io::Error> for GeneratorError {
    fn from(err: std::io::Error) -> Self {
        GeneratorError::new(GeneratorErrorKind::Io, "I/O failure").with_source(err)
    }
}

#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("{count} job(s) have no pipeline for their category, first '{job}' in category '{category}'")]
    UnmappedCategory {
        job: JobId,
        category: String,
        count: usize,
    },
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to open {manifest} manifest '{path}': {source}")]
    Open {
        manifest: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {manifest} manifest: {source}")]
    Write {
        manifest: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid dispatch configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Generator '{generator}' failed on chunk {chunk_index} of pipeline '{pipeline}' (first job '{first_job}'): {source}")]
    Systemic {
        generator: String,
        pipeline: String,
        chunk_index: usize,
        first_job: JobId,
        #[source]
        source: GeneratorError,
    },

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Dispatch cancelled before completion")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, BatchError>;
