//! Reads the tab-separated job list.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::config::schema::JobsConfig;
use crate::error::ConfigError;
use crate::job::{Job, JobId};

/// Loads the job list named by `config` and checks it carries the
/// category column.
pub fn load_jobs(config: &JobsConfig) -> Result<Vec<Job>, ConfigError> {
    let file = std::fs::File::open(&config.path).map_err(|e| ConfigError::ReadJobs {
        path: config.path.clone(),
        source: e.into(),
    })?;
    read_jobs(file, &config.path, &config.category_column)
}

/// Parses a job list with a header row. The first column holds the id;
/// every other column becomes a named field of the job.
pub fn read_jobs<R: Read>(
    reader: R,
    path: &Path,
    category_column: &str,
) -> Result<Vec<Job>, ConfigError> {
    let read_err = |source| ConfigError::ReadJobs {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(read_err)?.clone();
    if !headers.iter().skip(1).any(|h| h == category_column) {
        return Err(ConfigError::MissingColumn {
            path: path.to_path_buf(),
            column: category_column.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(read_err)?;
        let id = match record.get(0) {
            Some(id) if !id.is_empty() => JobId::from(id),
            _ => continue,
        };
        if !seen.insert(id.clone()) {
            return Err(ConfigError::DuplicateJob(id));
        }

        let job = headers
            .iter()
            .zip(record.iter())
            .skip(1)
            .fold(Job::new(id), |job, (name, value)| job.with_field(name, value));
        jobs.push(job);
    }

    debug!(path = %path.display(), jobs = jobs.len(), "loaded job list");
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(content: &str) -> Result<Vec<Job>, ConfigError> {
        read_jobs(content.as_bytes(), Path::new("jobs.tsv"), "site")
    }

    #[test]
    fn test_reads_ids_and_fields() {
        let jobs = read("participant\tsite\tkit\np-1\tstool\tK9\np-2\toral\tK3\n").unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, JobId::from("p-1"));
        assert_eq!(jobs[0].field("site"), Some("stool"));
        assert_eq!(jobs[0].field("kit"), Some("K9"));
        assert_eq!(jobs[1].field("site"), Some("oral"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let jobs = read("id\tsite\n\np-1\tstool\n\n\np-2\tskin\n").unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["p-1", "p-2"]);
    }

    #[test]
    fn test_short_rows_lack_the_missing_fields() {
        let jobs = read("id\tsite\np-1\n").unwrap();
        assert_eq!(jobs[0].field("site"), None);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let err = read("id\tsite\np-1\tstool\np-1\toral\n").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateJob(id) if id.as_str() == "p-1"));
    }

    #[test]
    fn test_missing_category_column() {
        let err = read("id\tkit\np-1\tK9\n").unwrap_err();
        match err {
            ConfigError::MissingColumn { column, .. } => assert_eq!(column, "site"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_load_jobs_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("jobs.tsv");
        std::fs::write(&path, "id\tcategory\na\tstool\n").unwrap();

        let jobs = load_jobs(&JobsConfig {
            path,
            category_column: "category".to_string(),
        })
        .unwrap();
        assert_eq!(jobs, vec![Job::new("a").with_field("category", "stool")]);
    }
}
