use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapter::AdapterRecord;
use crate::cli::VerifyArgs;
use crate::commands::batch::{load_batch, load_batch_manifest, update_batch_status};
use crate::commands::process::{BatchResultDocument, write_batch_result};
use crate::config::ArtifactPaths;
use crate::model::{AttributeKind, Batch, BatchStatus, Recommendation, TransformedRow};
use crate::util::{normalize_whitespace, text_similarity};

mod checks;
mod parse;
mod run;

pub use checks::{
    CompletenessCheck, EmptyField, FidelityCheck, MAJOR_MISMATCH_THRESHOLD, StructureCheck,
    TextMismatch, VerificationReport,
};
pub use parse::{ParsedTable, TableColumn, parse_table};
pub use run::{Verification, run, verify_batch};
