use super::*;

enum StageOutcome {
    Continue,
    Cancelled,
}

#[derive(Default)]
struct RunTotals {
    total_units: usize,
    units_verified: usize,
    batches_processed: usize,
    batches_failed: usize,
}

/// Runs every stage in order on the calling thread and owns the run state.
///
/// The state only leaves the worker as persisted `run_state.json` and as
/// snapshots on the event channel.
pub struct PipelineWorker {
    config: PipelineConfig,
    cancel: CancelFlag,
    events: Sender<RunEvent>,
    state: RunState,
    totals: RunTotals,
    started: Instant,
}

impl PipelineWorker {
    pub fn new(config: PipelineConfig, cancel: CancelFlag, events: Sender<RunEvent>) -> Self {
        let started_at = now_utc_string();
        let state = RunState {
            run_id: format!("run-{}", utc_compact_string(Utc::now())),
            status: RunStatus::Idle,
            current_stage: None,
            completed_stages: Vec::new(),
            batches: BatchProgress::default(),
            started_at: started_at.clone(),
            updated_at: started_at,
            finished_at: None,
            error: None,
            gap_status: None,
            summary: None,
        };

        Self {
            config,
            cancel,
            events,
            state,
            totals: RunTotals::default(),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Drives the run to a terminal status and returns the final state.
    /// Errors end the run as `failed`; they are never returned.
    pub fn run(mut self) -> RunState {
        self.state.status = RunStatus::Running;
        self.log(
            LogLevel::Info,
            format!(
                "run {} started for {}",
                self.state.run_id,
                self.config.source.display()
            ),
        );
        self.publish();

        let outcome = self.execute();

        self.state.current_stage = None;
        self.state.finished_at = Some(now_utc_string());
        match outcome {
            Ok(StageOutcome::Continue) => {
                self.state.status = RunStatus::Completed;
                let gap_status = self
                    .state
                    .gap_status
                    .map(GapStatus::as_str)
                    .unwrap_or("unknown");
                self.log(LogLevel::Info, format!("run completed; gap status {gap_status}"));
            }
            Ok(StageOutcome::Cancelled) => {
                self.state.status = RunStatus::Cancelled;
                self.log(
                    LogLevel::Warn,
                    "run cancelled; artifacts written so far are intact",
                );
            }
            Err(err) => {
                self.state.status = RunStatus::Failed;
                self.state.error = Some(format!("{err:#}"));
                self.log(LogLevel::Error, format!("run failed: {err:#}"));
            }
        }
        self.state.summary = Some(self.summary());
        self.publish();

        self.state
    }

    fn execute(&mut self) -> Result<StageOutcome> {
        for stage in Stage::ORDER {
            if self.cancel.is_cancelled() {
                return Ok(StageOutcome::Cancelled);
            }

            self.state.current_stage = Some(stage);
            self.log(
                LogLevel::Info,
                format!(
                    "stage {}/{}: {}",
                    stage.ordinal(),
                    Stage::ORDER.len(),
                    stage.as_str()
                ),
            );
            self.publish();

            if let StageOutcome::Cancelled = self.run_stage(stage)? {
                return Ok(StageOutcome::Cancelled);
            }
            self.state.completed_stages.push(stage);
        }
        Ok(StageOutcome::Continue)
    }

    fn run_stage(&mut self, stage: Stage) -> Result<StageOutcome> {
        match stage {
            Stage::Segment => {
                let unit_set = segment_source(
                    &self.config.source,
                    &self.config.paths.units_path,
                    self.config.force_resegment,
                )?;
                self.totals.total_units = unit_set.units.len();
                self.log(
                    LogLevel::Info,
                    format!(
                        "{} units across {} chapters",
                        unit_set.metadata.total_units, unit_set.metadata.total_chapters
                    ),
                );
            }
            Stage::Batch => {
                let unit_set = load_unit_set(&self.config.paths.units_path)?;
                let batches = create_batches(&unit_set.units, self.config.batch_size)?;
                let manifest = write_batches(
                    &self.config.paths,
                    &batches,
                    self.config.batch_size,
                    unit_set.units.len(),
                )?;
                self.state.batches = BatchProgress {
                    completed: 0,
                    total: manifest.total_batches,
                };
                self.log(
                    LogLevel::Info,
                    format!("{} batches of up to {} units", manifest.total_batches, manifest.batch_size),
                );
            }
            Stage::Process => return self.process_stage(),
            Stage::Merge => {
                let record = merge_workspace(&self.config.paths)?;
                self.log(
                    LogLevel::Info,
                    format!(
                        "master record holds {} of {} units",
                        record.metadata.total_units, record.metadata.source_units
                    ),
                );
                if record.warnings.count() > 0 || !record.errors.is_empty() {
                    self.log(
                        LogLevel::Warn,
                        format!(
                            "merge reported {} warnings and {} errors",
                            record.warnings.count(),
                            record.errors.len()
                        ),
                    );
                }
            }
            Stage::Audit => {
                let report =
                    audit_workspace(&self.config.paths, &self.config.paths.gap_report_path)?;
                self.state.gap_status = Some(report.status);
                let level = match report.status {
                    GapStatus::NoGapsDetected => LogLevel::Info,
                    GapStatus::WarningsDetected => LogLevel::Warn,
                    GapStatus::CriticalGapsDetected => LogLevel::Error,
                };
                self.log(level, format!("gap audit: {}", report.status));
            }
        }
        Ok(StageOutcome::Continue)
    }

    fn process_stage(&mut self) -> Result<StageOutcome> {
        let adapter: Box<dyn TransformAdapter> = build_adapter(&self.config.adapter)?;
        self.log(
            LogLevel::Info,
            format!(
                "transforming batches with {} (fallback policy {})",
                adapter.name(),
                self.config.adapter.fallback_policy.as_str()
            ),
        );

        let options = ProcessOptions {
            fallback_policy: self.config.adapter.fallback_policy,
            only: Vec::new(),
            skip_accepted: false,
        };

        let run_state_path = self.config.paths.run_state_path.clone();
        let state = &mut self.state;
        let events = &self.events;
        let summary = process_batches(
            &self.config.paths,
            adapter.as_ref(),
            &options,
            &self.cancel,
            &mut |progress, report| {
                state.batches = progress;
                state.updated_at = now_utc_string();
                write_json_pretty(&run_state_path, &*state)?;
                send(
                    events,
                    RunEvent::Log(LogLine::new(
                        if report.recommendation.is_accepted() {
                            LogLevel::Info
                        } else {
                            LogLevel::Warn
                        },
                        format!(
                            "{} {} ({}/{})",
                            report.batch_id, report.recommendation, progress.completed, progress.total
                        ),
                    )),
                );
                send(events, RunEvent::Snapshot(state.clone()));
                Ok(())
            },
        )?;

        self.totals.units_verified = summary.units_verified;
        self.totals.batches_processed = summary.processed + summary.skipped;
        self.totals.batches_failed = summary.rejected;

        if summary.cancelled {
            return Ok(StageOutcome::Cancelled);
        }
        if summary.rejected > 0 {
            self.log(
                LogLevel::Warn,
                format!("{} batches rejected by verification", summary.rejected),
            );
        }
        Ok(StageOutcome::Continue)
    }

    fn summary(&self) -> RunSummary {
        let verification_rate = (self.totals.total_units > 0).then(|| {
            self.totals.units_verified as f64 / self.totals.total_units as f64 * 100.0
        });
        RunSummary {
            duration_secs: self.started.elapsed().as_secs_f64(),
            total_units: self.totals.total_units,
            units_verified: self.totals.units_verified,
            verification_rate,
            batches_processed: self.totals.batches_processed,
            batches_failed: self.totals.batches_failed,
        }
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        send(&self.events, RunEvent::Log(LogLine::new(level, message)));
    }

    /// Persists the state, then hands a snapshot to the supervisor.
    fn publish(&mut self) {
        self.state.updated_at = now_utc_string();
        if let Err(err) = write_json_pretty(&self.config.paths.run_state_path, &self.state) {
            error!(error = %err, "failed to persist run state");
            self.log(LogLevel::Error, format!("failed to persist run state: {err:#}"));
        }
        send(&self.events, RunEvent::Snapshot(self.state.clone()));
    }
}

/// A closed channel only means nobody is watching; the run goes on.
fn send(events: &Sender<RunEvent>, event: RunEvent) {
    let _ = events.send(event);
}
