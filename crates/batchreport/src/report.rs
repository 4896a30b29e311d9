//! Per-invocation status reports and the error aggregator that folds them.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::job::{JobId, Outcome};

/// Outcomes produced by one generator invocation, keyed by job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    outcomes: HashMap<JobId, Outcome>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, id: JobId, outcome: Outcome) {
        self.outcomes.insert(id, outcome);
    }

    pub fn succeed(&mut self, id: JobId) {
        self.insert(id, Outcome::Success);
    }

    pub fn fail(&mut self, id: JobId, message: impl Into<String>) {
        self.insert(id, Outcome::failure(message));
    }

    pub fn get(&self, id: &JobId) -> Option<&Outcome> {
        self.outcomes.get(id)
    }

    pub fn remove(&mut self, id: &JobId) -> Option<Outcome> {
        self.outcomes.remove(id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JobId, &Outcome)> {
        self.outcomes.iter()
    }

    /// Folds another report into this one; later entries win.
    pub fn extend(&mut self, other: StatusReport) {
        self.outcomes.extend(other.outcomes);
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.values().filter(|o| !o.is_success()).count()
    }
}

impl FromIterator<(JobId, Outcome)> for StatusReport {
    fn from_iter<I: IntoIterator<Item = (JobId, Outcome)>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StatusReport {
    type Item = (JobId, Outcome);
    type IntoIter = std::collections::hash_map::IntoIter<JobId, Outcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

/// Errors collected per job across several status reports.
///
/// Every job seen in any absorbed report has exactly one entry. An empty
/// list means the job succeeded in every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MergedReport {
    errors: BTreeMap<JobId, Vec<String>>,
}

impl MergedReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the non-empty outcomes of `report` after those already held.
    pub fn absorb(&mut self, report: &StatusReport) {
        for (id, outcome) in report.iter() {
            let errors = self.errors.entry(id.clone()).or_default();
            if let Some(message) = outcome.message() {
                errors.push(message.to_string());
            }
        }
    }

    /// Appends every entry of another merged report, keeping its order.
    pub fn absorb_merged(&mut self, other: MergedReport) {
        for (id, messages) in other.errors {
            self.errors.entry(id).or_default().extend(messages);
        }
    }

    pub fn errors(&self, id: &JobId) -> Option<&[String]> {
        self.errors.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.errors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JobId, &[String])> {
        self.errors.iter().map(|(id, errs)| (id, errs.as_slice()))
    }

    pub fn successes(&self) -> impl Iterator<Item = &JobId> {
        self.errors
            .iter()
            .filter(|(_, errs)| errs.is_empty())
            .map(|(id, _)| id)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&JobId, &[String])> {
        self.iter().filter(|(_, errs)| !errs.is_empty())
    }

    pub fn failure_count(&self) -> usize {
        self.errors.values().filter(|errs| !errs.is_empty()).count()
    }
}

/// Combines status reports into one merged report, in the order supplied.
pub fn merge<'a, I>(reports: I) -> MergedReport
where
    I: IntoIterator<Item = &'a StatusReport>,
{
    let mut merged = MergedReport::new();
    for report in reports {
        merged.absorb(report);
    }
    merged
}
