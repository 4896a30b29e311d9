//! Shared test utilities for batchreport integration tests.
//!
//! This module provides:
//! - Stub generators with scripted per-job outcomes
//! - `TestHarness` owning a temp directory with manifest paths
//! - Builders for run configs and job lists

pub mod builders;
pub mod generators;
pub mod harness;

pub use builders::*;
pub use generators::*;
pub use harness::{FailureLine, TestHarness};
