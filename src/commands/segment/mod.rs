use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::cli::SegmentArgs;
use crate::config::ArtifactPaths;
use crate::model::{
    UNIT_SET_VERSION, Unit, UnitKind, UnitMetadata, UnitPosition, UnitSetDocument,
    UnitSetMetadata,
};
use crate::util::{
    normalize_whitespace, now_utc_string, read_json, sha256_file, short_digest, write_json_pretty,
};

mod run;
mod split;

pub use run::{load_unit_set, run, segment_source};
pub use split::Segmenter;
