use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::adapter::{TransformAdapter, build_adapter};
use crate::cli::RunArgs;
use crate::commands::audit::audit_workspace;
use crate::commands::batch::{create_batches, write_batches};
use crate::commands::merge::merge_workspace;
use crate::commands::process::{ProcessOptions, process_batches};
use crate::commands::segment::{load_unit_set, segment_source};
use crate::config::PipelineConfig;
use crate::control::{CancelFlag, take_cancel_request};
use crate::model::{BatchProgress, GapStatus, RunState, RunStatus, RunSummary, Stage};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

mod events;
mod run;
mod supervisor;
#[cfg(test)]
mod tests;
mod worker;

pub use events::{LogLevel, LogLine, RunEvent};
pub use run::run;
pub use supervisor::{FinishedRun, RunHandle, spawn_pipeline};
pub use worker::PipelineWorker;
