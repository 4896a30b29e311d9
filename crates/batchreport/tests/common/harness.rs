//! Test harness for isolated dispatch runs.
//!
//! The `TestHarness` owns a temporary directory holding the success and
//! failure manifests plus any job list or config a test writes, and
//! parses the manifests back after a run.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_fs::TempDir;

use batchreport::{
    DispatchConfig, DispatchError, DispatchSummary, Dispatcher, ManifestWriter, Options, Partition,
};

/// One parsed failure-manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureLine {
    pub id: String,
    pub messages: Vec<String>,
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub successes: PathBuf,
    pub failures: PathBuf,
    pub output_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path().to_path_buf();
        let output_dir = base.join("reports");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        Self {
            successes: base.join("manifests/successes.tsv"),
            failures: base.join("manifests/failures.tsv"),
            output_dir,
            temp_dir,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn temp_dir(&self) -> &TempDir {
        &self.temp_dir
    }

    pub fn options(&self) -> Arc<Options> {
        Arc::new(Options::new(&self.output_dir))
    }

    pub fn open_manifests(&self) -> ManifestWriter<File, File> {
        ManifestWriter::open(&self.successes, &self.failures).expect("Failed to open manifests")
    }

    /// Dispatches `partitions` into this harness's manifest files.
    pub fn dispatch(
        &self,
        config: DispatchConfig,
        partitions: &[Partition],
    ) -> Result<DispatchSummary, DispatchError> {
        let dispatcher = Dispatcher::new(config, self.options());
        let mut manifests = self.open_manifests();
        dispatcher.dispatch(&mut manifests, partitions)
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn success_text(&self) -> String {
        std::fs::read_to_string(&self.successes).expect("Failed to read success manifest")
    }

    pub fn failure_text(&self) -> String {
        std::fs::read_to_string(&self.failures).expect("Failed to read failure manifest")
    }

    /// Success ids in file order, header excluded.
    pub fn success_ids(&self) -> Vec<String> {
        self.success_text()
            .lines()
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    /// Success ids sorted, for comparisons that ignore chunk completion order.
    pub fn sorted_success_ids(&self) -> Vec<String> {
        let mut ids = self.success_ids();
        ids.sort();
        ids
    }

    /// Failure lines in file order, header excluded.
    pub fn failure_lines(&self) -> Vec<FailureLine> {
        self.failure_text()
            .lines()
            .skip(1)
            .map(|line| {
                let mut fields = line.split('\t').map(str::to_string);
                FailureLine {
                    id: fields.next().unwrap_or_default(),
                    messages: fields.collect(),
                }
            })
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
