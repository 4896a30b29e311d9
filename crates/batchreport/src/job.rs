use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for one unit of work (a participant-sample pair).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A job as read from a job list: its id plus the named fields that came
/// with it. One of the fields usually carries the job's category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Job {
    pub fn new(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Result of one generator invocation for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "message")]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    /// Builds a failure outcome; an empty message counts as success.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Outcome::Success
        } else {
            Outcome::Failure(message)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(message) => Some(message),
        }
    }
}

impl From<Option<String>> for Outcome {
    fn from(value: Option<String>) -> Self {
        value.map_or(Outcome::Success, Outcome::failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_failure_message_is_success() {
        assert_eq!(Outcome::failure(""), Outcome::Success);
        assert_eq!(Outcome::from(Some(String::new())), Outcome::Success);
        assert_eq!(Outcome::from(None), Outcome::Success);
    }

    #[test]
    fn test_failure_keeps_message() {
        let outcome = Outcome::failure("missing file");
        assert!(!outcome.is_success());
        assert_eq!(outcome.message(), Some("missing file"));
    }

    #[test]
    fn test_job_fields() {
        let job = Job::new("s-001").with_field("body_site", "stool");
        assert_eq!(job.id.as_str(), "s-001");
        assert_eq!(job.field("body_site"), Some("stool"));
        assert_eq!(job.field("age"), None);
    }
}
