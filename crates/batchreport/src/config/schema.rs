use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchConfig;
use crate::generator::CommandGenerator;
use crate::options::Options;
use crate::partition::PartitionTable;
use crate::pipeline::Pipeline;

/// Everything one `batchreport run` needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub version: String,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub options: Options,
    pub jobs: JobsConfig,
    pub manifests: ManifestConfig,
    /// Category → pipeline.
    pub pipelines: BTreeMap<String, PipelineSpec>,
    /// Applied to stages that set no `timeout_secs` of their own.
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Tab-separated job list with a header row; the first column is the id.
    pub path: PathBuf,
    #[serde(default = "default_category_column")]
    pub category_column: String,
}

fn default_category_column() -> String {
    "category".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    pub successes: PathBuf,
    pub failures: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Defaults to the category name.
    #[serde(default)]
    pub name: Option<String>,
    pub stages: Vec<StageSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl StageSpec {
    pub fn generator(&self, default_timeout_secs: Option<u64>) -> CommandGenerator {
        CommandGenerator::new(&self.name, &self.command)
            .args(self.args.iter().cloned())
            .timeout(
                self.timeout_secs
                    .or(default_timeout_secs)
                    .map(Duration::from_secs),
            )
    }
}

impl RunConfig {
    /// Builds the category table with one command generator per stage.
    pub fn partition_table(&self) -> PartitionTable {
        let mut table = PartitionTable::new();
        for (category, entry) in &self.pipelines {
            let name = entry.name.clone().unwrap_or_else(|| category.clone());
            let pipeline = entry.stages.iter().fold(Pipeline::new(name), |pipeline, stage| {
                pipeline.stage(Arc::new(stage.generator(self.default_timeout_secs)))
            });
            table.insert(category.clone(), pipeline);
        }
        table
    }

    pub fn shared_options(&self) -> Arc<Options> {
        Arc::new(self.options.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        serde_json::from_str(
            r#"{
                "version": "1.0",
                "jobs": { "path": "jobs.tsv" },
                "manifests": { "successes": "ok.tsv", "failures": "failed.tsv" },
                "default_timeout_secs": 600,
                "pipelines": {
                    "stool": {
                        "name": "stool-report",
                        "stages": [
                            { "name": "plots", "command": "make-plots", "args": ["{id}"] },
                            { "name": "tables", "command": "make-tables", "timeout_secs": 30 }
                        ]
                    },
                    "oral": {
                        "stages": [{ "name": "summary", "command": "summarize" }]
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_are_applied() {
        let config = config();
        assert_eq!(config.jobs.category_column, "category");
        assert_eq!(config.dispatch.chunk_size, 25);
        assert_eq!(config.options, Options::default());
    }

    #[test]
    fn test_partition_table_mirrors_pipelines() {
        let table = config().partition_table();

        assert_eq!(table.categories().collect::<Vec<_>>(), vec!["oral", "stool"]);
        let stool = table.get("stool").unwrap();
        assert_eq!(stool.name(), "stool-report");
        let stages: Vec<&str> = stool.stages().iter().map(|g| g.name()).collect();
        assert_eq!(stages, vec!["plots", "tables"]);
        assert_eq!(table.get("oral").unwrap().name(), "oral");
    }

    #[test]
    fn test_stage_timeout_overrides_default() {
        let config = config();
        let stages = &config.pipelines["stool"].stages;
        assert_eq!(
            stages[0].generator(config.default_timeout_secs).timeout_duration(),
            Some(Duration::from_secs(600))
        );
        assert_eq!(
            stages[1].generator(config.default_timeout_secs).timeout_duration(),
            Some(Duration::from_secs(30))
        );
    }
}
