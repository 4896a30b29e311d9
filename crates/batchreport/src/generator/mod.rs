//! Generators produce one artifact kind for a batch of jobs.
//!
//! A generator reports per-job failures in-band through its
//! [`StatusReport`] and only returns `Err` when the whole batch cannot be
//! attempted.

pub mod command;
pub mod template;

use std::fmt;
use std::sync::Arc;

use crate::error::GeneratorError;
use crate::job::{JobId, Outcome};
use crate::options::Options;
use crate::report::StatusReport;

pub use command::CommandGenerator;
pub use template::ArgTemplate;

/// A handler producing one artifact category for a batch of jobs.
///
/// Implementations are called concurrently from several workers with
/// disjoint `ids` and must not rely on the order jobs are processed in.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// Returns an outcome for every id in `ids`.
    fn generate(&self, options: &Options, ids: &[JobId]) -> Result<StatusReport, GeneratorError>;
}

impl fmt::Debug for dyn Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("name", &self.name())
            .finish()
    }
}

/// Wraps a batch closure as a generator.
pub struct FnGenerator<F> {
    name: String,
    func: F,
}

impl<F> Generator for FnGenerator<F>
where
    F: Fn(&Options, &[JobId]) -> Result<StatusReport, GeneratorError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, options: &Options, ids: &[JobId]) -> Result<StatusReport, GeneratorError> {
        (self.func)(options, ids)
    }
}

/// Wraps a per-job closure as a generator; the closure is called once per id
/// in the order supplied.
pub struct PerJobGenerator<F> {
    name: String,
    func: F,
}

impl<F> Generator for PerJobGenerator<F>
where
    F: Fn(&Options, &JobId) -> Result<Outcome, GeneratorError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, options: &Options, ids: &[JobId]) -> Result<StatusReport, GeneratorError> {
        let mut report = StatusReport::with_capacity(ids.len());
        for id in ids {
            let outcome = (self.func)(options, id)?;
            report.insert(id.clone(), outcome);
        }
        Ok(report)
    }
}

pub fn batch_fn<F>(name: impl Into<String>, func: F) -> Arc<dyn Generator>
where
    F: Fn(&Options, &[JobId]) -> Result<StatusReport, GeneratorError> + Send + Sync + 'static,
{
    Arc::new(FnGenerator {
        name: name.into(),
        func,
    })
}

pub fn per_job_fn<F>(name: impl Into<String>, func: F) -> Arc<dyn Generator>
where
    F: Fn(&Options, &JobId) -> Result<Outcome, GeneratorError> + Send + Sync + 'static,
{
    Arc::new(PerJobGenerator {
        name: name.into(),
        func,
    })
}
