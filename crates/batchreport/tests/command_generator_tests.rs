//! External-command generators driven through the dispatcher.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use batchreport::{
    CommandGenerator, DispatchConfig, DispatchError, GeneratorErrorKind, JobId, Partition,
    Pipeline,
};

use common::{ids, TestHarness};

fn shell(name: &str, script: &str) -> CommandGenerator {
    CommandGenerator::new(name, "sh").args(["-c", script, "batchreport-test", "{id}"])
}

#[test]
fn test_exit_status_and_stderr_become_failure_message() {
    let harness = TestHarness::new();
    let generator = shell(
        "plots",
        r#"if [ "$1" = "bad" ]; then echo "warming up" >&2; echo "no reads for $1" >&2; exit 3; fi"#,
    );
    let pipeline = Pipeline::new("stool-report").stage(Arc::new(generator));
    let partitions = vec![Partition::new(
        "stool",
        Arc::new(pipeline),
        ids(&["good", "bad"]),
    )];

    harness
        .dispatch(DispatchConfig::default().with_workers(2), &partitions)
        .unwrap();

    assert_eq!(harness.success_ids(), vec!["good"]);
    let failures = harness.failure_lines();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, "bad");
    let message = &failures[0].messages[0];
    assert!(message.starts_with("sh -c"), "{}", message);
    assert!(message.contains("exited with status 3: no reads for bad"), "{}", message);
}

#[test]
fn test_output_directory_placeholder_is_rendered() {
    let harness = TestHarness::new();
    let generator = CommandGenerator::new("touch", "touch").arg("{output_directory}/{id}.done");
    let pipeline = Pipeline::new("markers").stage(Arc::new(generator));
    let partitions = vec![Partition::new("stool", Arc::new(pipeline), ids(&["p-1", "p-2"]))];

    harness
        .dispatch(DispatchConfig::default().with_workers(2), &partitions)
        .unwrap();

    assert!(harness.output_dir.join("p-1.done").exists());
    assert!(harness.output_dir.join("p-2.done").exists());
}

#[test]
fn test_missing_program_fails_each_job_in_band() {
    let harness = TestHarness::new();
    let generator = CommandGenerator::new("ghost", "/nonexistent/batchreport-tool").arg("{id}");
    let pipeline = Pipeline::new("ghosts").stage(Arc::new(generator));
    let partitions = vec![Partition::new("stool", Arc::new(pipeline), ids(&["a", "b"]))];

    let summary = harness
        .dispatch(DispatchConfig::default().with_workers(1), &partitions)
        .unwrap();

    assert_eq!(summary.failure_lines, 2);
    assert!(harness
        .failure_lines()
        .iter()
        .all(|line| line.messages[0].contains("could not be started")));
}

#[test]
fn test_timeout_kills_the_command() {
    let harness = TestHarness::new();
    let generator = CommandGenerator::new("sleeper", "sleep")
        .arg("5")
        .timeout(Some(Duration::from_millis(200)));
    let pipeline = Pipeline::new("slow").stage(Arc::new(generator));
    let partitions = vec![Partition::new("stool", Arc::new(pipeline), ids(&["a"]))];

    harness
        .dispatch(DispatchConfig::default().with_workers(1), &partitions)
        .unwrap();

    let failures = harness.failure_lines();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].messages[0].contains("timed out after 0.2s"));
}

#[test]
fn test_timeout_bounds_a_shell_that_forks() {
    let harness = TestHarness::new();
    let generator = shell("forking", "sleep 4; true").timeout(Some(Duration::from_millis(200)));
    let pipeline = Pipeline::new("slow").stage(Arc::new(generator));
    let partitions = vec![Partition::new("stool", Arc::new(pipeline), ids(&["a", "b"]))];
    let started = Instant::now();

    harness
        .dispatch(DispatchConfig::default().with_workers(1), &partitions)
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    let failures = harness.failure_lines();
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .all(|line| line.messages[0].contains("timed out after 0.2s")));
}

#[test]
fn test_unknown_placeholder_is_systemic() {
    let harness = TestHarness::new();
    let generator = CommandGenerator::new("plots", "true").arg("{reference}");
    let pipeline = Pipeline::new("stool-report").stage(Arc::new(generator));
    let partitions = vec![Partition::new("stool", Arc::new(pipeline), ids(&["a"]))];

    let err = harness
        .dispatch(DispatchConfig::default().with_workers(1), &partitions)
        .unwrap_err();

    match err {
        DispatchError::Systemic {
            first_job, source, ..
        } => {
            assert_eq!(first_job, JobId::from("a"));
            assert_eq!(source.kind, GeneratorErrorKind::Template);
        }
        other => panic!("expected systemic error, got {:?}", other),
    }
}
