use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Read-only settings shared by every generator and worker for one run.
///
/// Built once by the caller and handed to the dispatcher behind an `Arc`;
/// nothing mutates it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Root directory generators write their artifacts under.
    #[serde(default)]
    pub output_directory: PathBuf,
    /// Free-form values generators may look up, e.g. reference file paths.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl Options {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
            vars: BTreeMap::new(),
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}
