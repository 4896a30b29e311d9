//! Groups jobs by category and binds each group to its pipeline.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PartitionError;
use crate::job::{Job, JobId};
use crate::pipeline::Pipeline;

/// What to do with jobs whose category has no pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Leave them out of both manifests.
    Drop,
    /// Record one failure line per job.
    #[default]
    Report,
    /// Refuse to dispatch anything.
    Fail,
}

impl fmt::Display for UnmappedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnmappedPolicy::Drop => "drop",
            UnmappedPolicy::Report => "report",
            UnmappedPolicy::Fail => "fail",
        };
        f.write_str(name)
    }
}

impl FromStr for UnmappedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(UnmappedPolicy::Drop),
            "report" => Ok(UnmappedPolicy::Report),
            "fail" => Ok(UnmappedPolicy::Fail),
            other => Err(format!(
                "unknown unmapped-category policy '{}', expected drop, report or fail",
                other
            )),
        }
    }
}

/// Static category → pipeline table, read-only for a run.
#[derive(Debug, Clone, Default)]
pub struct PartitionTable {
    pipelines: BTreeMap<String, Arc<Pipeline>>,
}

impl PartitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: impl Into<String>, pipeline: Pipeline) -> Self {
        self.insert(category, pipeline);
        self
    }

    pub fn insert(&mut self, category: impl Into<String>, pipeline: Pipeline) {
        self.pipelines.insert(category.into(), Arc::new(pipeline));
    }

    pub fn get(&self, category: &str) -> Option<&Arc<Pipeline>> {
        self.pipelines.get(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

/// One category's jobs bound to that category's pipeline.
#[derive(Debug, Clone)]
pub struct Partition {
    pub category: String,
    pub pipeline: Arc<Pipeline>,
    pub ids: Vec<JobId>,
}

impl Partition {
    pub fn new(category: impl Into<String>, pipeline: Arc<Pipeline>, ids: Vec<JobId>) -> Self {
        Self {
            category: category.into(),
            pipeline,
            ids,
        }
    }
}

/// A job whose category matched no pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedJob {
    pub id: JobId,
    pub category: String,
}

impl UnmappedJob {
    pub fn failure_message(&self) -> String {
        format!("no pipeline configured for category '{}'", self.category)
    }
}

#[derive(Debug, Clone)]
pub struct Partitioning {
    pub partitions: Vec<Partition>,
    /// Empty unless the policy is `Report`.
    pub unmapped: Vec<UnmappedJob>,
}

impl Partitioning {
    pub fn job_count(&self) -> usize {
        self.partitions.iter().map(|p| p.ids.len()).sum()
    }
}

/// Splits `jobs` into one partition per table category, in table order.
///
/// Every category in the table yields a partition, even when no job
/// carries it. Jobs keep their input order within a partition.
pub fn partition<'j, I, F>(
    jobs: I,
    category_of: F,
    table: &PartitionTable,
    policy: UnmappedPolicy,
) -> Result<Partitioning, PartitionError>
where
    I: IntoIterator<Item = &'j Job>,
    F: Fn(&Job) -> String,
{
    let mut grouped: HashMap<&str, Vec<JobId>> =
        table.categories().map(|c| (c, Vec::new())).collect();
    let mut unmapped = Vec::new();

    for job in jobs {
        let category = category_of(job);
        match grouped.get_mut(category.as_str()) {
            Some(ids) => ids.push(job.id.clone()),
            None => unmapped.push(UnmappedJob {
                id: job.id.clone(),
                category,
            }),
        }
    }

    if !unmapped.is_empty() {
        match policy {
            UnmappedPolicy::Fail => {
                let first = &unmapped[0];
                return Err(PartitionError::UnmappedCategory {
                    job: first.id.clone(),
                    category: first.category.clone(),
                    count: unmapped.len(),
                });
            }
            UnmappedPolicy::Drop => {
                debug!(count = unmapped.len(), "dropping jobs with unmapped categories");
                unmapped.clear();
            }
            UnmappedPolicy::Report => {}
        }
    }

    let partitions = table
        .pipelines
        .iter()
        .map(|(category, pipeline)| Partition {
            category: category.clone(),
            pipeline: Arc::clone(pipeline),
            ids: grouped.remove(category.as_str()).unwrap_or_default(),
        })
        .collect();

    Ok(Partitioning {
        partitions,
        unmapped,
    })
}

/// `category_of` for jobs that carry their category in a named field.
/// Jobs without the field fall into the empty category.
pub fn by_field(field: &str) -> impl Fn(&Job) -> String + '_ {
    move |job: &Job| job.field(field).unwrap_or_default().to_string()
}
