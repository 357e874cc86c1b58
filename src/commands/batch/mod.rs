use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::BatchArgs;
use crate::commands::segment::load_unit_set;
use crate::config::ArtifactPaths;
use crate::model::{
    BATCH_MANIFEST_VERSION, Batch, BatchManifest, BatchManifestEntry, BatchStatus, BatchUnit,
    Unit, batch_id_for_index,
};
use crate::util::{now_utc_string, read_json, write_json_pretty};

mod prompt;
mod run;
#[cfg(test)]
mod tests;

pub use prompt::{REQUIRED_TABLE_HEADER, render_instruction_payload};
pub use run::{
    create_batches, load_batch, load_batch_manifest, run, update_batch_status, write_batches,
};
