//! Append-only success and failure manifests.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::chunk::Chunk;
use crate::error::ManifestError;
use crate::job::{JobId, Outcome};
use crate::report::StatusReport;

pub const SUCCESS_HEADER: &str = "job_id";
pub const FAILURE_HEADER: &str = "job_id\terrors";

const SUCCESSES: &str = "success";
const FAILURES: &str = "failure";

/// Owns both manifest streams for the duration of a dispatch.
///
/// Only the dispatching thread writes here; workers hand back reports.
pub struct ManifestWriter<S: Write, F: Write> {
    successes: BufWriter<S>,
    failures: BufWriter<F>,
    success_lines: usize,
    failure_lines: usize,
}

impl<S: Write, F: Write> ManifestWriter<S, F> {
    /// Wraps two fresh streams and writes both headers.
    pub fn new(successes: S, failures: F) -> Result<Self, ManifestError> {
        let mut writer = Self::append(successes, failures);
        writer.write_success_header()?;
        writer.write_failure_header()?;
        Ok(writer)
    }

    /// Wraps streams that already carry their headers.
    pub fn append(successes: S, failures: F) -> Self {
        Self {
            successes: BufWriter::new(successes),
            failures: BufWriter::new(failures),
            success_lines: 0,
            failure_lines: 0,
        }
    }

    fn write_success_header(&mut self) -> Result<(), ManifestError> {
        writeln!(self.successes, "{}", SUCCESS_HEADER).map_err(|source| ManifestError::Write {
            manifest: SUCCESSES,
            source,
        })
    }

    fn write_failure_header(&mut self) -> Result<(), ManifestError> {
        writeln!(self.failures, "{}", FAILURE_HEADER).map_err(|source| ManifestError::Write {
            manifest: FAILURES,
            source,
        })
    }

    pub fn record_success(&mut self, id: &JobId) -> Result<(), ManifestError> {
        writeln!(self.successes, "{}", sanitize_field(id.as_str())).map_err(|source| {
            ManifestError::Write {
                manifest: SUCCESSES,
                source,
            }
        })?;
        self.success_lines += 1;
        Ok(())
    }

    pub fn record_failure<M: AsRef<str>>(
        &mut self,
        id: &JobId,
        messages: &[M],
    ) -> Result<(), ManifestError> {
        let mut line = sanitize_field(id.as_str());
        for message in messages {
            line.push('\t');
            line.push_str(&sanitize_field(message.as_ref()));
        }
        writeln!(self.failures, "{}", line).map_err(|source| ManifestError::Write {
            manifest: FAILURES,
            source,
        })?;
        self.failure_lines += 1;
        Ok(())
    }

    /// Writes one line per job of `chunk`, in chunk order.
    pub fn record_chunk(&mut self, chunk: &Chunk, report: &StatusReport) -> Result<(), ManifestError> {
        for id in &chunk.ids {
            match report.get(id) {
                Some(Outcome::Failure(message)) => self.record_failure(id, &[message])?,
                Some(Outcome::Success) => self.record_success(id)?,
                None => {}
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ManifestError> {
        self.successes.flush().map_err(|source| ManifestError::Write {
            manifest: SUCCESSES,
            source,
        })?;
        self.failures.flush().map_err(|source| ManifestError::Write {
            manifest: FAILURES,
            source,
        })
    }

    pub fn success_lines(&self) -> usize {
        self.success_lines
    }

    pub fn failure_lines(&self) -> usize {
        self.failure_lines
    }

    /// Flushes and hands back the underlying streams.
    pub fn into_inner(self) -> Result<(S, F), ManifestError> {
        let successes = self
            .successes
            .into_inner()
            .map_err(|e| ManifestError::Write {
                manifest: SUCCESSES,
                source: e.into_error(),
            })?;
        let failures = self
            .failures
            .into_inner()
            .map_err(|e| ManifestError::Write {
                manifest: FAILURES,
                source: e.into_error(),
            })?;
        Ok((successes, failures))
    }
}

impl ManifestWriter<File, File> {
    /// Opens both manifest files for appending, creating them if needed.
    /// A header is written only into a file that is still empty.
    pub fn open(successes: &Path, failures: &Path) -> Result<Self, ManifestError> {
        let (success_file, success_fresh) = open_append(successes, SUCCESSES)?;
        let (failure_file, failure_fresh) = open_append(failures, FAILURES)?;

        let mut writer = Self::append(success_file, failure_file);
        if success_fresh {
            writer.write_success_header()?;
        }
        if failure_fresh {
            writer.write_failure_header()?;
        }
        Ok(writer)
    }
}

fn open_append(path: &Path, manifest: &'static str) -> Result<(File, bool), ManifestError> {
    let open_err = |source| ManifestError::Open {
        manifest,
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(open_err)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_err)?;
    let fresh = file.metadata().map_err(open_err)?.len() == 0;
    Ok((file, fresh))
}

/// Keeps one manifest entry on one line and inside one column.
fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
