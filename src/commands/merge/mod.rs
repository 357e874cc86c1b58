use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cli::MergeArgs;
use crate::commands::batch::{load_batch, load_batch_manifest};
use crate::commands::process::{BatchResultDocument, load_batch_result};
use crate::commands::segment::load_unit_set;
use crate::config::ArtifactPaths;
use crate::model::{
    AttributeKind, Batch, Recommendation, TransformedRow, Unit, UnitKind, uid_sort_key,
};
use crate::util::{read_json, sha256_hex, write_json_pretty};

mod run;
mod statistics;

pub use run::{
    MasterMetadata, MasterRecord, MasterRow, MergeError, MergeWarnings, RejectedBatch,
    ResultFile, StaleResult, UnitEnrichment, build_master_record, load_master_record,
    merge_workspace, run,
};
pub use statistics::{EntityCount, MergeStatistics};
