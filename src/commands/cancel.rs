use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CancelArgs;
use crate::config::ArtifactPaths;
use crate::control::write_cancel_request;
use crate::model::{RunState, RunStatus};
use crate::util::read_json;

pub fn run(args: CancelArgs) -> Result<()> {
    let paths = ArtifactPaths::new(&args.workspace);

    let running = if paths.run_state_path.exists() {
        let state: RunState = read_json(&paths.run_state_path)?;
        (state.status == RunStatus::Running).then_some(state)
    } else {
        None
    };

    match &running {
        Some(state) => info!(
            run_id = %state.run_id,
            stage = state.current_stage.map(|stage| stage.as_str()).unwrap_or_default(),
            "requesting cancellation"
        ),
        None => warn!(
            workspace = %paths.workspace.display(),
            "no running pipeline recorded; the next run discards this request on start"
        ),
    }

    let request = write_cancel_request(&paths.cancel_request_path)?;
    info!(
        path = %paths.cancel_request_path.display(),
        requested_at = %request.requested_at,
        "cancel request written"
    );

    Ok(())
}
