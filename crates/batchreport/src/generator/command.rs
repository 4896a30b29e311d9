//! Generator that runs one external command per job.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use tracing::{debug, info_span, warn};

use crate::error::GeneratorError;
use crate::job::{JobId, Outcome};
use crate::options::Options;
use crate::report::StatusReport;

use super::template::ArgTemplate;
use super::Generator;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long output is still collected after a timed command exits.
const OUTPUT_GRACE: Duration = Duration::from_millis(250);

/// Runs `program` with rendered argument templates once per job.
///
/// A non-zero exit, a failed spawn or a timeout become per-job failures;
/// only a template that cannot be rendered aborts the whole chunk.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    name: String,
    program: String,
    args: Vec<ArgTemplate>,
    timeout: Option<Duration>,
}

enum Completion {
    Exited {
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    TimedOut,
}

impl CommandGenerator {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, template: impl Into<String>) -> Self {
        self.args.push(ArgTemplate::new(template));
        self
    }

    pub fn args<I, S>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(templates.into_iter().map(ArgTemplate::new));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arg_templates(&self) -> &[ArgTemplate] {
        &self.args
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
    }

    fn run_one(&self, options: &Options, id: &JobId) -> Result<Outcome, GeneratorError> {
        let args = self
            .args
            .iter()
            .map(|template| template.render(id, options))
            .collect::<Result<Vec<_>, _>>()?;
        let command_line = format_command_line(&self.program, &args);
        debug!(job_id = %id, command = %command_line, "running command");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout also reaches anything the command forks.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Ok(Outcome::failure(format!(
                    "{} could not be started: {}",
                    command_line, e
                )))
            }
        };

        let outcome = match wait_with_timeout(child, self.timeout) {
            Ok(Completion::Exited { status, .. }) if status.success() => Outcome::Success,
            Ok(Completion::Exited {
                status,
                stdout,
                stderr,
            }) => {
                let mut message = match status.code() {
                    Some(code) => format!("{} exited with status {}", command_line, code),
                    None => format!("{} was terminated by a signal", command_line),
                };
                if let Some(line) = last_line(&stderr).or_else(|| last_line(&stdout)) {
                    message.push_str(": ");
                    message.push_str(&line);
                }
                Outcome::failure(message)
            }
            Ok(Completion::TimedOut) => {
                let secs = self.timeout.map(|t| t.as_secs_f64()).unwrap_or_default();
                warn!(job_id = %id, command = %command_line, "command timed out");
                Outcome::failure(format!("{} timed out after {}s", command_line, secs))
            }
            Err(e) => Outcome::failure(format!("{} failed while waiting: {}", command_line, e)),
        };

        Ok(outcome)
    }
}

impl Generator for CommandGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, options: &Options, ids: &[JobId]) -> Result<StatusReport, GeneratorError> {
        let _span = info_span!("generator.command", generator = %self.name).entered();
        let mut report = StatusReport::with_capacity(ids.len());
        for id in ids {
            let outcome = self.run_one(options, id)?;
            report.insert(id.clone(), outcome);
        }
        Ok(report)
    }
}

fn wait_with_timeout(
    mut child: Child,
    timeout: Option<Duration>,
) -> std::io::Result<Completion> {
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let (status, deadline) = match timeout {
        None => (child.wait()?, None),
        Some(limit) => {
            let deadline = Instant::now() + limit;
            loop {
                if let Some(status) = child.try_wait()? {
                    break (status, Some(deadline.max(Instant::now() + OUTPUT_GRACE)));
                }
                let now = Instant::now();
                if now >= deadline {
                    kill_process_group(&mut child);
                    if let Err(e) = child.wait() {
                        warn!(pid = child.id(), error = %e, "failed to reap timed out command");
                    }
                    // Readers may still be blocked on pipes held by a
                    // descendant that left the group; they are not waited for.
                    return Ok(Completion::TimedOut);
                }
                thread::sleep(POLL_INTERVAL.min(deadline - now));
            }
        }
    };

    Ok(Completion::Exited {
        status,
        stdout: collect_output(stdout_reader, deadline),
        stderr: collect_output(stderr_reader, deadline),
    })
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pid = child.id();
    match i32::try_from(pid) {
        Ok(raw) => {
            if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                warn!(pid, error = %e, "failed to kill process group, killing the command only");
                kill_child(child);
            }
        }
        Err(_) => kill_child(child),
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    kill_child(child);
}

fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(pid = child.id(), error = %e, "failed to kill timed out command");
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Output of one reader; gives up at `deadline` when a descendant keeps
/// the pipe open past the command's own exit.
fn collect_output(reader: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> Vec<u8> {
    let Some(reader) = reader else {
        return Vec::new();
    };
    match deadline {
        None => reader.recv().unwrap_or_default(),
        Some(deadline) => reader.recv_deadline(deadline).unwrap_or_default(),
    }
}

fn last_line(output: &[u8]) -> Option<String> {
    String::from_utf8_lossy(output)
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn format_command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('\'');
            line.push_str(arg);
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}
