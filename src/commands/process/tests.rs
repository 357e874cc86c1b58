use std::sync::Mutex;

use super::*;
use crate::adapter::{FallbackGenerator, TransformOutcome};
use crate::commands::batch::{create_batches, write_batches};
use crate::commands::segment::{load_unit_set, segment_source};
use crate::model::Batch;

const STORY: &str = "Chapter 1: The Factory
The gates opened at dawn. Maya walked in. The zombie horde waited outside.

Jake checked the shield generator. It hummed quietly.

Chapter 2: The Sewers
Dr. Sarah waved. \"Run!\" she said.
";

struct UnreachableService;

impl TransformAdapter for UnreachableService {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn transform(&self, _batch: &Batch) -> TransformOutcome {
        TransformOutcome::Failure("service unavailable".to_string())
    }
}

/// Fallback generator that records which batches were submitted to it.
#[derive(Default)]
struct RecordingGenerator {
    submitted: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    fn submitted(&self) -> Vec<String> {
        self.submitted.lock().expect("lock").clone()
    }
}

impl TransformAdapter for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    fn transform(&self, batch: &Batch) -> TransformOutcome {
        self.submitted
            .lock()
            .expect("lock")
            .push(batch.batch_id.clone());
        FallbackGenerator.transform(batch)
    }
}

fn prepare_workspace(root: &Path, batch_size: usize) -> ArtifactPaths {
    let paths = ArtifactPaths::new(&root.join("workspace"));
    let source = root.join("story.txt");
    std::fs::write(&source, STORY).expect("write story");

    let unit_set = segment_source(&source, &paths.units_path, false).expect("segment");
    let batches = create_batches(&unit_set.units, batch_size).expect("batches");
    write_batches(&paths, &batches, batch_size, unit_set.units.len()).expect("write batches");
    paths
}

fn options(policy: FallbackPolicy) -> ProcessOptions {
    ProcessOptions {
        fallback_policy: policy,
        only: Vec::new(),
        skip_accepted: false,
    }
}

#[test]
fn process_batches_verifies_and_persists_every_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = prepare_workspace(dir.path(), 3);

    let mut seen = Vec::new();
    let summary = process_batches(
        &paths,
        &FallbackGenerator,
        &options(FallbackPolicy::Substitute),
        &CancelFlag::new(),
        &mut |progress, report| {
            seen.push((progress, report.batch_id.clone()));
            Ok(())
        },
    )
    .expect("process");

    let manifest = load_batch_manifest(&paths.batch_manifest_path).expect("manifest");
    assert_eq!(summary.processed, manifest.total_batches);
    assert_eq!(summary.accepted, manifest.total_batches);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.units_verified, manifest.total_units);
    assert!(!summary.cancelled);

    assert!(
        manifest
            .batches
            .iter()
            .all(|entry| entry.status == BatchStatus::Accepted)
    );
    for entry in &manifest.batches {
        let document = load_batch_result(&paths.result_path(&entry.batch_id)).expect("result");
        assert_eq!(document.adapter.adapter, "fallback");
        assert_eq!(document.parsed_rows.len(), entry.units_count);
    }

    assert_eq!(seen.len(), manifest.total_batches);
    assert_eq!(seen[0].1, "BATCH_0001");
    assert_eq!(seen.last().map(|(progress, _)| progress.completed), Some(seen.len()));
}

#[test]
fn record_policy_rejects_batches_when_service_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = prepare_workspace(dir.path(), 50);

    let summary = process_batches(
        &paths,
        &UnreachableService,
        &options(FallbackPolicy::Record),
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )
    .expect("process");

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.fallback_used, 0);

    let document = load_batch_result(&paths.result_path("BATCH_0001")).expect("result");
    assert_eq!(document.adapter.failure.as_deref(), Some("service unavailable"));
    assert!(document.raw_response.is_empty());
    assert_eq!(document.recommendation(), Recommendation::Reject);
}

#[test]
fn substitute_policy_uses_fallback_table_when_service_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = prepare_workspace(dir.path(), 50);

    let summary = process_batches(
        &paths,
        &UnreachableService,
        &options(FallbackPolicy::Substitute),
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )
    .expect("process");

    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.fallback_used, 1);
}

#[test]
fn cancelled_flag_stops_before_first_submission() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = prepare_workspace(dir.path(), 3);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let summary = process_batches(
        &paths,
        &FallbackGenerator,
        &options(FallbackPolicy::Substitute),
        &cancel,
        &mut |_, _| Ok(()),
    )
    .expect("process");

    assert!(summary.cancelled);
    assert_eq!(summary.processed, 0);
    assert!(!paths.result_path("BATCH_0001").exists());
}

#[test]
fn only_restricts_processing_and_rejects_unknown_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = prepare_workspace(dir.path(), 3);

    let mut selected = options(FallbackPolicy::Substitute);
    selected.only = vec!["BATCH_0002".to_string()];
    let summary = process_batches(
        &paths,
        &FallbackGenerator,
        &selected,
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )
    .expect("process");
    assert_eq!(summary.processed, 1);
    assert!(!paths.result_path("BATCH_0001").exists());
    assert!(paths.result_path("BATCH_0002").exists());

    selected.only = vec!["BATCH_0099".to_string()];
    let error = process_batches(
        &paths,
        &FallbackGenerator,
        &selected,
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )
    .expect_err("unknown batch id");
    assert!(error.to_string().contains("BATCH_0099"));
}

#[test]
fn skip_accepted_resumes_without_resubmitting() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = prepare_workspace(dir.path(), 3);

    process_batches(
        &paths,
        &FallbackGenerator,
        &options(FallbackPolicy::Substitute),
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )
    .expect("first pass");

    let mut resume = options(FallbackPolicy::Record);
    resume.skip_accepted = true;
    let summary = process_batches(
        &paths,
        &UnreachableService,
        &resume,
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )
    .expect("resume");

    let manifest = load_batch_manifest(&paths.batch_manifest_path).expect("manifest");
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, manifest.total_batches);
    assert_eq!(summary.units_verified, manifest.total_units);
}

#[test]
fn cancel_during_run_stops_after_the_batch_in_flight() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = prepare_workspace(dir.path(), 3);
    let adapter = RecordingGenerator::default();
    let cancel = CancelFlag::new();
    let requester = cancel.clone();

    let summary = process_batches(
        &paths,
        &adapter,
        &options(FallbackPolicy::Substitute),
        &cancel,
        &mut |_, _| {
            requester.cancel();
            Ok(())
        },
    )
    .expect("process");

    assert!(summary.cancelled);
    assert_eq!(summary.processed, 1);
    assert_eq!(adapter.submitted(), vec!["BATCH_0001"]);

    let document = load_batch_result(&paths.result_path("BATCH_0001")).expect("result");
    assert_eq!(document.batch_id, "BATCH_0001");
    assert!(document.recommendation().is_accepted());
    assert!(!paths.result_path("BATCH_0002").exists());

    let manifest = load_batch_manifest(&paths.batch_manifest_path).expect("manifest");
    assert_eq!(manifest.batches[0].status, BatchStatus::Accepted);
    assert!(
        manifest.batches[1..]
            .iter()
            .all(|entry| entry.status == BatchStatus::Pending)
    );
}

#[test]
fn skip_accepted_reprocesses_results_from_an_earlier_partition() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = prepare_workspace(dir.path(), 3);

    process_batches(
        &paths,
        &FallbackGenerator,
        &options(FallbackPolicy::Substitute),
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )
    .expect("first pass");

    let unit_set = load_unit_set(&paths.units_path).expect("units");
    let batches = create_batches(&unit_set.units, 2).expect("rebatch");
    write_batches(&paths, &batches, 2, unit_set.units.len()).expect("write batches");

    let mut resume = options(FallbackPolicy::Record);
    resume.skip_accepted = true;
    let summary = process_batches(
        &paths,
        &UnreachableService,
        &resume,
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )
    .expect("resume");

    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.processed, batches.len());
    assert_eq!(summary.rejected, batches.len());
    assert_eq!(summary.units_verified, 0);
}
