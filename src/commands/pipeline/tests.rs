use std::path::Path;

use super::*;
use crate::config::{AdapterConfig, ArtifactPaths};
use crate::util::read_json;

const STORY: &str = "Chapter 1: The Factory
The gates opened at dawn. Maya walked in. The zombie horde waited outside.

Jake checked the shield generator. It hummed quietly.

Chapter 2: The Sewers
Dr. Sarah waved. \"Run!\" she said. The crystal glowed in the dark.
";

fn pipeline_config(root: &Path, batch_size: usize) -> PipelineConfig {
    let source = root.join("story.txt");
    std::fs::write(&source, STORY).expect("write story");
    PipelineConfig {
        paths: ArtifactPaths::new(&root.join("workspace")),
        source,
        batch_size,
        force_resegment: false,
        adapter: AdapterConfig::fallback_only(),
    }
}

fn log_messages(events: &[RunEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            RunEvent::Log(line) => Some(line.message.as_str()),
            RunEvent::Snapshot(_) => None,
        })
        .collect()
}

#[test]
fn supervised_run_completes_every_stage_with_fallback_adapter() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = pipeline_config(dir.path(), 4);
    let paths = config.paths.clone();

    let handle = spawn_pipeline(config).expect("spawn");
    assert_eq!(handle.snapshot().status, RunStatus::Idle);
    let finished = handle.wait().expect("wait");
    let state = finished.state;

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_stages, Stage::ORDER.to_vec());
    assert_eq!(state.current_stage, None);
    assert_eq!(state.gap_status, Some(GapStatus::NoGapsDetected));
    assert!(state.finished_at.is_some());
    assert!(state.error.is_none());
    assert_eq!(state.batches.completed, state.batches.total);

    let summary = state.summary.clone().expect("summary");
    assert!(summary.total_units > 0);
    assert_eq!(summary.units_verified, summary.total_units);
    assert_eq!(summary.verification_rate, Some(100.0));
    assert_eq!(summary.batches_failed, 0);
    assert_eq!(summary.batches_processed, state.batches.total);

    assert!(paths.units_path.exists());
    assert!(paths.batch_manifest_path.exists());
    assert!(paths.mapping_path.exists());
    assert!(paths.gap_report_path.exists());

    let persisted: RunState = read_json(&paths.run_state_path).expect("run state");
    assert_eq!(persisted.run_id, state.run_id);
    assert_eq!(persisted.status, RunStatus::Completed);
    assert_eq!(persisted.completed_stages, state.completed_stages);

    let messages = log_messages(&finished.remaining_events);
    assert!(messages.iter().any(|message| message.starts_with("stage 1/5: segment")));
    assert!(messages.iter().any(|message| message.starts_with("stage 5/5: audit")));
    assert!(
        finished
            .remaining_events
            .iter()
            .any(|event| matches!(event, RunEvent::Snapshot(snapshot) if snapshot.status == RunStatus::Completed))
    );
}

#[test]
fn drained_snapshots_track_the_latest_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut handle = spawn_pipeline(pipeline_config(dir.path(), 2)).expect("spawn");

    while !handle.is_finished() {
        handle.drain();
        thread::sleep(Duration::from_millis(5));
    }
    handle.drain();
    assert_eq!(handle.snapshot().status, RunStatus::Completed);

    let finished = handle.wait().expect("wait");
    assert!(finished.remaining_events.is_empty());
}

#[test]
fn cancellation_before_first_stage_leaves_run_cancelled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = pipeline_config(dir.path(), 4);
    let paths = config.paths.clone();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let (sender, receiver) = mpsc::channel();
    let state = PipelineWorker::new(config, cancel, sender).run();

    assert_eq!(state.status, RunStatus::Cancelled);
    assert!(state.completed_stages.is_empty());
    assert!(state.error.is_none());
    assert!(!paths.units_path.exists());

    let events = receiver.try_iter().collect::<Vec<_>>();
    assert!(
        log_messages(&events)
            .iter()
            .any(|message| message.starts_with("run cancelled"))
    );

    let persisted: RunState = read_json(&paths.run_state_path).expect("run state");
    assert_eq!(persisted.status, RunStatus::Cancelled);
}

#[test]
fn missing_source_fails_the_run_with_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = pipeline_config(dir.path(), 4);
    config.source = dir.path().join("missing.txt");
    let paths = config.paths.clone();

    let finished = spawn_pipeline(config).expect("spawn").wait().expect("wait");
    let state = finished.state;

    assert_eq!(state.status, RunStatus::Failed);
    assert!(state.completed_stages.is_empty());
    assert!(state.error.as_deref().is_some_and(|error| error.contains("missing.txt")));
    assert_eq!(state.gap_status, None);

    let persisted: RunState = read_json(&paths.run_state_path).expect("run state");
    assert_eq!(persisted.status, RunStatus::Failed);
}

#[test]
fn zero_batch_size_fails_in_batch_stage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = pipeline_config(dir.path(), 0);

    let state = spawn_pipeline(config).expect("spawn").wait().expect("wait").state;

    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.completed_stages, vec![Stage::Segment]);
    assert!(
        state
            .error
            .as_deref()
            .is_some_and(|error| error.contains("batch size must be greater than zero"))
    );
}
