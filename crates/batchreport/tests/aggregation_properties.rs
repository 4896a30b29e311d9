//! Property tests for report merging and stage-level coverage.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use batchreport::{merge, run_pipeline, JobId, Options, Outcome, Pipeline, StatusReport};

use common::scripted;

fn report_strategy() -> impl Strategy<Value = StatusReport> {
    prop::collection::btree_map("[a-f]", prop::option::of("[a-z]{1,6}"), 0..6).prop_map(|map| {
        map.into_iter()
            .map(|(id, message)| (JobId::from(id), Outcome::from(message)))
            .collect()
    })
}

proptest! {
    #[test]
    fn merged_report_covers_every_input_id(reports in prop::collection::vec(report_strategy(), 0..5)) {
        let merged = merge(&reports);

        let expected: BTreeSet<&JobId> = reports.iter().flat_map(|r| r.iter().map(|(id, _)| id)).collect();
        let actual: BTreeSet<&JobId> = merged.iter().map(|(id, _)| id).collect();
        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn merged_messages_follow_report_order(reports in prop::collection::vec(report_strategy(), 1..5)) {
        let merged = merge(&reports);

        for (id, errors) in merged.iter() {
            let expected: Vec<&str> = reports
                .iter()
                .filter_map(|r| r.get(id).and_then(Outcome::message))
                .collect();
            let actual: Vec<&str> = errors.iter().map(String::as_str).collect();
            prop_assert_eq!(expected, actual);
        }
    }

    #[test]
    fn all_success_reports_merge_to_empty_lists(ids in prop::collection::btree_set("[a-z]{1,4}", 0..20)) {
        let report: StatusReport = ids.iter().map(|id| (JobId::from(id.as_str()), Outcome::Success)).collect();
        let merged = merge([&report]);

        prop_assert_eq!(merged.len(), ids.len());
        prop_assert_eq!(merged.failure_count(), 0);
    }

    #[test]
    fn every_stage_sees_every_job(count in 0usize..40, chunk_size in 1usize..8) {
        let ids: Vec<JobId> = (0..count).map(|i| JobId::new(format!("j{}", i))).collect();
        let pipeline = Pipeline::new("p")
            .stage(scripted("s1", &[("j0", "first")]))
            .stage(scripted("s2", &[("j0", "second")]));

        let merged = run_pipeline(&pipeline, Arc::new(Options::default()), &ids, chunk_size).unwrap();

        prop_assert_eq!(merged.len(), count);
        if count > 0 {
            prop_assert_eq!(
                merged.errors(&JobId::from("j0")).unwrap(),
                &["first".to_string(), "second".to_string()][..]
            );
        }
    }
}
