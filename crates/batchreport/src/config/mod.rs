pub mod jobs;
pub mod loader;
pub mod schema;

pub use jobs::{load_jobs, read_jobs};
pub use loader::{load_config, load_config_from_str, validate_config, ConfigFormat};
pub use schema::{JobsConfig, ManifestConfig, PipelineSpec, RunConfig, StageSpec};
