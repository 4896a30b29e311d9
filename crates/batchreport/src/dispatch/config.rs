use serde::{Deserialize, Serialize};

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::error::DispatchError;
use crate::partition::UnmappedPolicy;

/// Operator settings for one dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub on_unmapped_category: UnmappedPolicy,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            chunk_size: default_chunk_size(),
            on_unmapped_category: UnmappedPolicy::default(),
        }
    }
}

impl DispatchConfig {
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_unmapped_policy(mut self, policy: UnmappedPolicy) -> Self {
        self.on_unmapped_category = policy;
        self
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.worker_count == 0 {
            return Err(DispatchError::InvalidConfig(
                "worker_count must be > 0".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(DispatchError::InvalidConfig(
                "chunk_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
