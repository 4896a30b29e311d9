//! Builders for run configs and job lists.
//!
//! These keep integration tests free of hand-written YAML where only one
//! or two settings matter.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use batchreport::config::{JobsConfig, ManifestConfig, PipelineSpec, RunConfig, StageSpec};
use batchreport::{DispatchConfig, Options, UnmappedPolicy};

/// Builder for `RunConfig` instances.
pub struct RunConfigBuilder {
    dispatch: DispatchConfig,
    options: Options,
    jobs_path: PathBuf,
    category_column: String,
    successes: PathBuf,
    failures: PathBuf,
    pipelines: BTreeMap<String, PipelineSpec>,
    default_timeout_secs: Option<u64>,
}

impl RunConfigBuilder {
    /// Paths default to files under `base`.
    pub fn new(base: &Path) -> Self {
        Self {
            dispatch: DispatchConfig::default().with_workers(2).with_chunk_size(2),
            options: Options::new(base.join("reports")),
            jobs_path: base.join("jobs.tsv"),
            category_column: "category".to_string(),
            successes: base.join("successes.tsv"),
            failures: base.join("failures.tsv"),
            pipelines: BTreeMap::new(),
            default_timeout_secs: None,
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.dispatch.worker_count = count;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.dispatch.chunk_size = size;
        self
    }

    pub fn on_unmapped(mut self, policy: UnmappedPolicy) -> Self {
        self.dispatch.on_unmapped_category = policy;
        self
    }

    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.options = self.options.with_var(name, value);
        self
    }

    pub fn category_column(mut self, column: &str) -> Self {
        self.category_column = column.to_string();
        self
    }

    pub fn pipeline(mut self, category: &str, stages: Vec<StageSpec>) -> Self {
        self.pipelines.insert(
            category.to_string(),
            PipelineSpec {
                name: None,
                stages,
            },
        );
        self
    }

    pub fn default_timeout_secs(mut self, secs: u64) -> Self {
        self.default_timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> RunConfig {
        RunConfig {
            version: "1.0".to_string(),
            dispatch: self.dispatch,
            options: self.options,
            jobs: JobsConfig {
                path: self.jobs_path,
                category_column: self.category_column,
            },
            manifests: ManifestConfig {
                successes: self.successes,
                failures: self.failures,
            },
            pipelines: self.pipelines,
            default_timeout_secs: self.default_timeout_secs,
        }
    }
}

/// Creates a stage running `command` with `args`.
pub fn stage(name: &str, command: &str, args: &[&str]) -> StageSpec {
    StageSpec {
        name: name.to_string(),
        command: command.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        timeout_secs: None,
    }
}

/// Builder for tab-separated job lists.
pub struct JobListBuilder {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl JobListBuilder {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            header: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: &[&str]) -> Self {
        self.rows.push(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn to_tsv(&self) -> String {
        let mut out = self.header.join("\t");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }
}
