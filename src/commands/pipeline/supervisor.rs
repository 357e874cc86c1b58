use super::*;

/// Supervisor side of a running pipeline.
///
/// Owns the receiving end of the event channel and the latest snapshot it
/// has seen. The worker's state is never shared directly.
pub struct RunHandle {
    cancel: CancelFlag,
    events: Receiver<RunEvent>,
    latest: RunState,
    join: Option<JoinHandle<RunState>>,
}

#[derive(Debug)]
pub struct FinishedRun {
    pub state: RunState,
    pub remaining_events: Vec<RunEvent>,
}

pub fn spawn_pipeline(config: PipelineConfig) -> Result<RunHandle> {
    let cancel = CancelFlag::new();
    let (sender, receiver) = mpsc::channel();
    let worker = PipelineWorker::new(config, cancel.clone(), sender);
    let latest = worker.state().clone();

    let join = thread::Builder::new()
        .name("zeroloss-worker".to_string())
        .spawn(move || worker.run())
        .context("failed to spawn pipeline worker thread")?;

    Ok(RunHandle {
        cancel,
        events: receiver,
        latest,
        join: Some(join),
    })
}

impl RunHandle {
    /// Requests cancellation; the worker stops at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Takes every event queued so far without blocking.
    pub fn drain(&mut self) -> Vec<RunEvent> {
        let mut drained = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if let RunEvent::Snapshot(state) = &event {
                        self.latest = state.clone();
                    }
                    drained.push(event);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    pub fn snapshot(&self) -> &RunState {
        &self.latest
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Blocks until the worker exits and returns its final state together
    /// with any events not yet drained.
    pub fn wait(mut self) -> Result<FinishedRun> {
        let Some(join) = self.join.take() else {
            bail!("pipeline worker already joined");
        };
        let state = join
            .join()
            .map_err(|_| anyhow!("pipeline worker panicked"))?;
        let remaining_events = self.drain();
        Ok(FinishedRun {
            state,
            remaining_events,
        })
    }
}
