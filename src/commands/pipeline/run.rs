use super::*;

/// Runs the whole pipeline under a supervised worker and returns the gap
/// status of a completed run, or `None` when the run was cancelled.
pub fn run(args: RunArgs) -> Result<Option<GapStatus>> {
    let config = PipelineConfig::from_run_args(&args);
    let cancel_request_path = config.paths.cancel_request_path.clone();
    if take_cancel_request(&cancel_request_path)? {
        warn!(
            path = %cancel_request_path.display(),
            "discarded stale cancel request from an earlier run"
        );
    }

    info!(
        source = %config.source.display(),
        workspace = %config.paths.workspace.display(),
        batch_size = config.batch_size,
        adapter = config.adapter.kind.as_str(),
        "starting pipeline run"
    );

    let poll_interval = Duration::from_millis(args.poll_interval_ms.max(10));
    let mut handle = spawn_pipeline(config)?;
    let mut cancel_sent = false;

    loop {
        emit_events(handle.drain());

        if !cancel_sent && take_cancel_request(&cancel_request_path)? {
            warn!("cancel requested; stopping at the next checkpoint");
            handle.cancel();
            cancel_sent = true;
        }

        if handle.is_finished() {
            break;
        }
        thread::sleep(poll_interval);
    }

    let finished = handle.wait()?;
    emit_events(finished.remaining_events);
    let state = finished.state;

    match state.status {
        RunStatus::Completed => {
            if let Some(summary) = &state.summary {
                info!(
                    run_id = %state.run_id,
                    duration_secs = %format!("{:.1}", summary.duration_secs),
                    total_units = summary.total_units,
                    units_verified = summary.units_verified,
                    verification_rate = %summary
                        .verification_rate
                        .map(|rate| format!("{rate:.1}%"))
                        .unwrap_or_else(|| "n/a".to_string()),
                    batches_processed = summary.batches_processed,
                    batches_failed = summary.batches_failed,
                    "pipeline run completed"
                );
            }
            Ok(state.gap_status)
        }
        RunStatus::Cancelled => {
            warn!(
                run_id = %state.run_id,
                completed_stages = state.completed_stages.len(),
                batches_completed = state.batches.completed,
                batches_total = state.batches.total,
                "pipeline run cancelled"
            );
            Ok(None)
        }
        RunStatus::Failed => bail!(
            "pipeline run {} failed: {}",
            state.run_id,
            state.error.as_deref().unwrap_or("unknown error")
        ),
        RunStatus::Idle | RunStatus::Running => bail!(
            "pipeline worker exited with non-terminal status {}",
            state.status.as_str()
        ),
    }
}

fn emit_events(events: Vec<RunEvent>) {
    for event in events {
        let RunEvent::Log(line) = event else {
            continue;
        };
        match line.level {
            LogLevel::Info => info!(at = %line.timestamp, "{}", line.message),
            LogLevel::Warn => warn!(at = %line.timestamp, "{}", line.message),
            LogLevel::Error => error!(at = %line.timestamp, "{}", line.message),
        }
    }
}
