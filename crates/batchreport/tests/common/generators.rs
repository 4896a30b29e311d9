//! Stub generators with scripted outcomes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use batchreport::{batch_fn, per_job_fn, Generator, GeneratorError, JobId, Outcome};

/// Every invocation's id list, in the order the invocations happened.
pub type CallLog = Arc<Mutex<Vec<Vec<JobId>>>>;

/// Succeeds for every id except those in `failures`, which fail with the
/// mapped message.
pub fn scripted(name: &str, failures: &[(&str, &str)]) -> Arc<dyn Generator> {
    let failures: HashMap<String, String> = failures
        .iter()
        .map(|(id, msg)| (id.to_string(), msg.to_string()))
        .collect();
    per_job_fn(name, move |_, id| {
        Ok(match failures.get(id.as_str()) {
            Some(msg) => Outcome::failure(msg.clone()),
            None => Outcome::Success,
        })
    })
}

/// Like `scripted`, but also records the ids of every invocation.
pub fn recording(name: &str, failures: &[(&str, &str)]) -> (Arc<dyn Generator>, CallLog) {
    let inner = scripted(name, failures);
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&calls);
    let generator = batch_fn(name, move |options, ids| {
        log.lock().unwrap().push(ids.to_vec());
        inner.generate(options, ids)
    });
    (generator, calls)
}

/// Fails the whole chunk with a setup error when it contains `poison`.
pub fn systemic_on(name: &str, poison: &str, reason: &str) -> Arc<dyn Generator> {
    let poison = JobId::from(poison);
    let reason = reason.to_string();
    batch_fn(name, move |_, ids| {
        if ids.contains(&poison) {
            return Err(GeneratorError::setup(reason.clone()));
        }
        Ok(ids.iter().map(|id| (id.clone(), Outcome::Success)).collect())
    })
}

pub fn ids(names: &[&str]) -> Vec<JobId> {
    names.iter().map(|n| JobId::from(*n)).collect()
}
