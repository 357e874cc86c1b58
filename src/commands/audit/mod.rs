use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cli::AuditArgs;
use crate::commands::merge::{MasterRow, load_master_record};
use crate::commands::segment::load_unit_set;
use crate::config::ArtifactPaths;
use crate::model::{GapStatus, Unit, uid_chapter};
use crate::util::{normalize_whitespace, now_utc_string, text_similarity, write_json_pretty};

mod report;
mod run;
#[cfg(test)]
mod tests;

pub use report::{ChapterChange, GapReport, GapSummary, MappedTextMismatch, build_gap_report};
pub use run::{audit_workspace, run};
