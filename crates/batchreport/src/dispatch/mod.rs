//! Fan-out of partitioned jobs over a worker pool, with outcomes streamed
//! into the success and failure manifests.

pub mod config;
pub mod dispatcher;
pub mod manifest;
pub mod summary;

pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use manifest::{ManifestWriter, FAILURE_HEADER, SUCCESS_HEADER};
pub use summary::{DispatchSummary, PipelineSummary};
