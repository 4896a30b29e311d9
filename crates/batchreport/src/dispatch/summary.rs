use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::job::JobId;
use crate::report::MergedReport;

/// Merged outcome of one category's pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub category: String,
    pub pipeline: String,
    pub stages: usize,
    pub jobs: usize,
    pub report: MergedReport,
}

impl PipelineSummary {
    pub fn failed_jobs(&self) -> usize {
        self.report.failure_count()
    }
}

/// What one dispatch call did.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pipelines: Vec<PipelineSummary>,
    /// Jobs reported because their category had no pipeline.
    pub unmapped: Vec<JobId>,
    pub success_lines: usize,
    pub failure_lines: usize,
}

impl DispatchSummary {
    pub(crate) fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            pipelines: Vec::new(),
            unmapped: Vec::new(),
            success_lines: 0,
            failure_lines: 0,
        }
    }

    pub fn pipeline(&self, category: &str) -> Option<&PipelineSummary> {
        self.pipelines.iter().find(|p| p.category == category)
    }

    /// Every dispatched job's errors across all pipelines.
    pub fn merged(&self) -> MergedReport {
        let mut merged = MergedReport::new();
        for summary in &self.pipelines {
            merged.absorb_merged(summary.report.clone());
        }
        merged
    }

    pub fn total_jobs(&self) -> usize {
        self.pipelines.iter().map(|p| p.jobs).sum()
    }

    pub fn failed_jobs(&self) -> usize {
        self.pipelines.iter().map(PipelineSummary::failed_jobs).sum::<usize>() + self.unmapped.len()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
