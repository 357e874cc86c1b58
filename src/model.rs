use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::sha256_hex;

pub const UNIT_SET_VERSION: u32 = 1;
pub const BATCH_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    ChapterHeader,
    StructuredLine,
    Sentence,
}

impl UnitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChapterHeader => "chapter_header",
            Self::StructuredLine => "structured_line",
            Self::Sentence => "sentence",
        }
    }
}

/// Hierarchical position of a unit; the uid is derived from it and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitPosition {
    pub chapter: u32,
    pub paragraph: u32,
    pub sentence: u32,
}

impl UnitPosition {
    pub fn new(chapter: u32, paragraph: u32, sentence: u32) -> Self {
        Self {
            chapter,
            paragraph,
            sentence,
        }
    }

    pub fn uid(&self) -> String {
        format!(
            "CH{:02}-P{:03}-S{:03}",
            self.chapter, self.paragraph, self.sentence
        )
    }

    /// Parses `CHcc-Pppp-Ssss`. Returns `None` for anything else.
    pub fn parse(uid: &str) -> Option<Self> {
        let mut parts = uid.trim().split('-');
        let chapter = parse_component(parts.next()?, "CH")?;
        let paragraph = parse_component(parts.next()?, "P")?;
        let sentence = parse_component(parts.next()?, "S")?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(chapter, paragraph, sentence))
    }
}

fn parse_component(value: &str, prefix: &str) -> Option<u32> {
    let digits = value.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Chapter number encoded in a uid's `CHnn` prefix.
pub fn uid_chapter(uid: &str) -> Option<u32> {
    parse_component(uid.trim().split('-').next()?, "CH")
}

/// Sort key that agrees with lexicographic uid order for well-formed uids and
/// keeps malformed uids after them, in lexicographic order.
pub fn uid_sort_key(uid: &str) -> (bool, Option<UnitPosition>, &str) {
    let position = UnitPosition::parse(uid);
    (position.is_none(), position, uid)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetadata {
    pub word_count: usize,
    #[serde(default)]
    pub is_header: bool,
    #[serde(default)]
    pub is_list_item: bool,
    #[serde(default)]
    pub is_definition: bool,
    #[serde(default)]
    pub has_dialogue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub uid: String,
    pub kind: UnitKind,
    pub chapter: u32,
    pub paragraph: u32,
    pub sentence: u32,
    pub text: String,
    pub content_digest: String,
    pub metadata: UnitMetadata,
}

impl Unit {
    pub fn position(&self) -> UnitPosition {
        UnitPosition::new(self.chapter, self.paragraph, self.sentence)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSetMetadata {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_file: String,
    pub source_sha256: String,
    pub total_units: usize,
    pub total_chapters: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSetDocument {
    pub metadata: UnitSetMetadata,
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUnit {
    pub uid: String,
    pub text: String,
    pub content_digest: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Accepted,
    AcceptedWithWarnings,
    Rejected,
}

impl BatchStatus {
    pub fn from_recommendation(recommendation: Recommendation) -> Self {
        match recommendation {
            Recommendation::Accept => Self::Accepted,
            Recommendation::AcceptWithWarnings => Self::AcceptedWithWarnings,
            Recommendation::Reject => Self::Rejected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::AcceptedWithWarnings => "accepted_with_warnings",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub batch_index: usize,
    pub total_batches: usize,
    pub units_count: usize,
    pub units: Vec<BatchUnit>,
    pub instruction_payload: String,
    pub status: BatchStatus,
}

impl Batch {
    pub fn unit_uids(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|unit| unit.uid.as_str())
    }

    /// SHA-256 over the ordered uids and texts. Changes whenever the batch
    /// is re-partitioned or its source is re-segmented with different text.
    pub fn content_fingerprint(&self) -> String {
        let mut input = String::new();
        for unit in &self.units {
            input.push_str(&unit.uid);
            input.push('\u{1f}');
            input.push_str(&unit.text);
            input.push('\n');
        }
        sha256_hex(input.as_bytes())
    }
}

pub fn batch_id_for_index(batch_index: usize) -> String {
    format!("BATCH_{batch_index:04}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchManifestEntry {
    pub batch_id: String,
    pub units_count: usize,
    pub status: BatchStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub batch_size: usize,
    pub total_batches: usize,
    pub total_units: usize,
    pub batches: Vec<BatchManifestEntry>,
}

/// Optional attribute lists a transformed row may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Characters,
    Locations,
    Concepts,
    Links,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 4] = [
        Self::Characters,
        Self::Locations,
        Self::Concepts,
        Self::Links,
    ];

    /// Column title used in the instruction payload's table header.
    pub fn column_title(self) -> &'static str {
        match self {
            Self::Characters => "Characters",
            Self::Locations => "Locations",
            Self::Concepts => "Key Items/Concepts",
            Self::Links => "Links",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedRow {
    pub uid: String,
    pub raw_sentence: String,
    pub narrative_purpose: String,
    #[serde(default)]
    pub attributes: BTreeMap<AttributeKind, Vec<String>>,
}

impl TransformedRow {
    pub fn attribute(&self, kind: AttributeKind) -> &[String] {
        self.attributes
            .get(&kind)
            .map(|values| values.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Accept,
    AcceptWithWarnings,
    Reject,
}

impl Recommendation {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accept | Self::AcceptWithWarnings)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::AcceptWithWarnings => "ACCEPT_WITH_WARNINGS",
            Self::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapStatus {
    NoGapsDetected,
    WarningsDetected,
    CriticalGapsDetected,
}

impl GapStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoGapsDetected => "NO_GAPS_DETECTED",
            Self::WarningsDetected => "WARNINGS_DETECTED",
            Self::CriticalGapsDetected => "CRITICAL_GAPS_DETECTED",
        }
    }

    /// Process exit code for automated callers.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::CriticalGapsDetected => 2,
            Self::NoGapsDetected | Self::WarningsDetected => 0,
        }
    }
}

impl fmt::Display for GapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Segment,
    Batch,
    Process,
    Merge,
    Audit,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Self::Segment,
        Self::Batch,
        Self::Process,
        Self::Merge,
        Self::Audit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Batch => "batch",
            Self::Process => "process",
            Self::Merge => "merge",
            Self::Audit => "audit",
        }
    }

    pub fn ordinal(self) -> usize {
        Self::ORDER
            .iter()
            .position(|stage| *stage == self)
            .map(|index| index + 1)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub duration_secs: f64,
    pub total_units: usize,
    pub units_verified: usize,
    pub verification_rate: Option<f64>,
    pub batches_processed: usize,
    pub batches_failed: usize,
}

/// Worker-owned record of a pipeline run, persisted as `run_state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub status: RunStatus,
    pub current_stage: Option<Stage>,
    #[serde(default)]
    pub completed_stages: Vec<Stage>,
    #[serde(default)]
    pub batches: BatchProgress,
    pub started_at: String,
    pub updated_at: String,
    pub finished_at: Option<String>,
    pub error: Option<String>,
    pub gap_status: Option<GapStatus>,
    pub summary: Option<RunSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_round_trips_through_position() {
        let position = UnitPosition::new(3, 12, 7);
        assert_eq!(position.uid(), "CH03-P012-S007");
        assert_eq!(UnitPosition::parse("CH03-P012-S007"), Some(position));
    }

    #[test]
    fn uid_parse_rejects_malformed_values() {
        assert_eq!(UnitPosition::parse("CH03-P012"), None);
        assert_eq!(UnitPosition::parse("CHxx-P012-S001"), None);
        assert_eq!(UnitPosition::parse("CH01-P001-S001-extra"), None);
        assert_eq!(uid_chapter("CH07-P001-S001"), Some(7));
        assert_eq!(uid_chapter("chapter seven"), None);
    }

    #[test]
    fn uid_sort_key_places_malformed_uids_last() {
        let mut uids = vec!["zzz", "CH02-P001-S001", "CH01-P010-S002", "CH01-P002-S001"];
        uids.sort_by(|a, b| uid_sort_key(a).cmp(&uid_sort_key(b)));
        assert_eq!(
            uids,
            vec!["CH01-P002-S001", "CH01-P010-S002", "CH02-P001-S001", "zzz"]
        );
    }

    #[test]
    fn recommendation_serializes_in_screaming_case() {
        let value = serde_json::to_value(Recommendation::AcceptWithWarnings).expect("serialize");
        assert_eq!(value, serde_json::json!("ACCEPT_WITH_WARNINGS"));
        assert!(Recommendation::AcceptWithWarnings.is_accepted());
        assert!(!Recommendation::Reject.is_accepted());
    }
}
