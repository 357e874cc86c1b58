use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapter::{AdapterRecord, TransformAdapter, build_adapter, obtain_response};
use crate::cli::{FallbackPolicy, ProcessArgs};
use crate::commands::batch::{load_batch, load_batch_manifest, update_batch_status};
use crate::commands::verify::{Verification, VerificationReport, verify_batch};
use crate::config::{AdapterConfig, ArtifactPaths};
use crate::control::CancelFlag;
use crate::model::{Batch, BatchProgress, BatchStatus, Recommendation, TransformedRow};
use crate::util::{now_utc_string, read_json, write_json_pretty};

mod result;
mod run;
#[cfg(test)]
mod tests;

pub use result::{BatchResultDocument, load_batch_result, write_batch_result};
pub use run::{ProcessOptions, ProcessSummary, process_batches, run};
