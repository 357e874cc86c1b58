use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::audit::GapReport;
use crate::commands::merge::MasterRecord;
use crate::config::ArtifactPaths;
use crate::model::{BatchManifest, RunState, Stage, UnitSetDocument};
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let paths = ArtifactPaths::new(&args.workspace);
    info!(workspace = %paths.workspace.display(), "status requested");

    if let Some(state) = load_optional::<RunState>(&paths.run_state_path, "run state")? {
        info!(
            run_id = %state.run_id,
            status = state.status.as_str(),
            current_stage = state.current_stage.map(Stage::as_str).unwrap_or_default(),
            completed_stages = %state
                .completed_stages
                .iter()
                .map(|stage| stage.as_str())
                .collect::<Vec<_>>()
                .join(","),
            batches_completed = state.batches.completed,
            batches_total = state.batches.total,
            started_at = %state.started_at,
            updated_at = %state.updated_at,
            finished_at = %state.finished_at.unwrap_or_default(),
            gap_status = state.gap_status.map(|status| status.as_str()).unwrap_or_default(),
            "loaded run state"
        );
        if let Some(error) = &state.error {
            warn!(run_id = %state.run_id, error = %error, "last run failed");
        }
        if paths.cancel_request_path.exists() {
            warn!(
                path = %paths.cancel_request_path.display(),
                "cancel request pending; the running pipeline has not picked it up yet"
            );
        }
    }

    if let Some(unit_set) = load_optional::<UnitSetDocument>(&paths.units_path, "unit set")? {
        info!(
            source = %unit_set.metadata.source_file,
            generated_at = %unit_set.metadata.generated_at,
            units = unit_set.metadata.total_units,
            chapters = unit_set.metadata.total_chapters,
            "loaded unit set"
        );
    }

    if let Some(manifest) =
        load_optional::<BatchManifest>(&paths.batch_manifest_path, "batch manifest")?
    {
        let mut by_status: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &manifest.batches {
            *by_status.entry(entry.status.as_str()).or_default() += 1;
        }
        info!(
            batches = manifest.total_batches,
            batch_size = manifest.batch_size,
            units = manifest.total_units,
            pending = by_status.get("pending").copied().unwrap_or_default(),
            accepted = by_status.get("accepted").copied().unwrap_or_default(),
            accepted_with_warnings = by_status
                .get("accepted_with_warnings")
                .copied()
                .unwrap_or_default(),
            rejected = by_status.get("rejected").copied().unwrap_or_default(),
            "loaded batch manifest"
        );
    }

    if let Some(record) = load_optional::<MasterRecord>(&paths.mapping_path, "master record")? {
        info!(
            mapped_units = record.metadata.total_units,
            source_units = record.metadata.source_units,
            batches_merged = record.metadata.batches_merged,
            batches_rejected = record.metadata.batches_rejected,
            warnings = record.warnings.count(),
            errors = record.errors.len(),
            "loaded master record"
        );
    }

    if let Some(report) = load_optional::<GapReport>(&paths.gap_report_path, "gap report")? {
        info!(
            status = %report.status,
            generated_at = %report.generated_at,
            missing = report.summary.missing_uids,
            extra = report.summary.extra_uids,
            chapters_changed = report.summary.chapters_changed,
            text_mismatches = report.summary.text_mismatches,
            "loaded gap report"
        );
    }

    Ok(())
}

fn load_optional<T: DeserializeOwned>(path: &Path, label: &str) -> Result<Option<T>> {
    if !path.exists() {
        warn!(path = %path.display(), "{label} missing");
        return Ok(None);
    }
    read_json(path).map(Some)
}
