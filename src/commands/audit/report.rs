use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterChange {
    pub chapter: u32,
    pub original_count: usize,
    pub mapped_count: usize,
    /// `mapped_count - original_count`.
    pub difference: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedTextMismatch {
    pub uid: String,
    pub original: String,
    pub mapped: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapSummary {
    pub original_units: usize,
    pub mapped_units: usize,
    pub missing_uids: usize,
    pub extra_uids: usize,
    pub unparseable_uids: usize,
    pub chapters_changed: usize,
    pub text_mismatches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    pub generated_at: String,
    pub status: GapStatus,
    pub summary: GapSummary,
    pub missing_from_mapping: Vec<String>,
    pub extra_in_mapping: Vec<String>,
    /// Mapped uids without a readable chapter prefix; also listed as extra.
    pub unparseable_uids: Vec<String>,
    pub chapter_changes: Vec<ChapterChange>,
    pub text_mismatches: Vec<MappedTextMismatch>,
    pub recommendations: Vec<String>,
}

/// Diffs the master record's rows against the unit set. Read-only over both.
pub fn build_gap_report(units: &[Unit], rows: &[MasterRow]) -> GapReport {
    let originals = units
        .iter()
        .map(|unit| (unit.uid.as_str(), unit.text.as_str()))
        .collect::<HashMap<_, _>>();
    let mapped = rows
        .iter()
        .map(|row| row.row.uid.as_str())
        .collect::<BTreeSet<_>>();

    let missing_from_mapping = units
        .iter()
        .filter(|unit| !mapped.contains(unit.uid.as_str()))
        .map(|unit| unit.uid.clone())
        .collect::<Vec<_>>();
    let extra_in_mapping = mapped
        .iter()
        .filter(|uid| !originals.contains_key(*uid))
        .map(|uid| (*uid).to_string())
        .collect::<Vec<_>>();
    let unparseable_uids = mapped
        .iter()
        .filter(|uid| uid_chapter(uid).is_none())
        .map(|uid| (*uid).to_string())
        .collect::<Vec<_>>();

    let chapter_changes = chapter_changes(units, rows);

    let mut text_mismatches = Vec::new();
    for row in rows {
        let Some(original) = originals.get(row.row.uid.as_str()) else {
            continue;
        };
        if normalize_whitespace(original) == normalize_whitespace(&row.row.raw_sentence) {
            continue;
        }
        text_mismatches.push(MappedTextMismatch {
            uid: row.row.uid.clone(),
            original: (*original).to_string(),
            mapped: row.row.raw_sentence.clone(),
            similarity: text_similarity(original, &row.row.raw_sentence),
        });
    }

    let status = if !missing_from_mapping.is_empty() || !chapter_changes.is_empty() {
        GapStatus::CriticalGapsDetected
    } else if !extra_in_mapping.is_empty() || !text_mismatches.is_empty() {
        GapStatus::WarningsDetected
    } else {
        GapStatus::NoGapsDetected
    };

    let summary = GapSummary {
        original_units: units.len(),
        mapped_units: rows.len(),
        missing_uids: missing_from_mapping.len(),
        extra_uids: extra_in_mapping.len(),
        unparseable_uids: unparseable_uids.len(),
        chapters_changed: chapter_changes.len(),
        text_mismatches: text_mismatches.len(),
    };

    GapReport {
        generated_at: now_utc_string(),
        status,
        recommendations: recommendations(&summary),
        summary,
        missing_from_mapping,
        extra_in_mapping,
        unparseable_uids,
        chapter_changes,
        text_mismatches,
    }
}

/// Per-chapter row counts; a mapped chapter comes from the uid prefix, so a
/// row filed under the wrong chapter shows up even when totals balance.
fn chapter_changes(units: &[Unit], rows: &[MasterRow]) -> Vec<ChapterChange> {
    let mut original_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for unit in units {
        *original_counts.entry(unit.chapter).or_default() += 1;
    }
    let mut mapped_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for row in rows {
        if let Some(chapter) = uid_chapter(&row.row.uid) {
            *mapped_counts.entry(chapter).or_default() += 1;
        }
    }

    original_counts
        .keys()
        .chain(mapped_counts.keys())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|chapter| {
            let original_count = original_counts.get(&chapter).copied().unwrap_or_default();
            let mapped_count = mapped_counts.get(&chapter).copied().unwrap_or_default();
            (original_count != mapped_count).then(|| ChapterChange {
                chapter,
                original_count,
                mapped_count,
                difference: mapped_count as i64 - original_count as i64,
            })
        })
        .collect()
}

fn recommendations(summary: &GapSummary) -> Vec<String> {
    let mut recommendations = Vec::new();
    if summary.missing_uids > 0 {
        recommendations.push(format!(
            "CRITICAL: {} uids missing from the master record; reprocess the batches that own them",
            summary.missing_uids
        ));
    }
    if summary.chapters_changed > 0 {
        recommendations.push(format!(
            "CRITICAL: {} chapters have count changes; check for omissions or misfiled rows",
            summary.chapters_changed
        ));
    }
    if summary.extra_uids > 0 {
        recommendations.push(format!(
            "WARNING: {} extra uids in the master record; possible invented or duplicated rows",
            summary.extra_uids
        ));
    }
    if summary.text_mismatches > 0 {
        recommendations.push(format!(
            "WARNING: {} text mismatches detected; review the affected batch results",
            summary.text_mismatches
        ));
    }
    if recommendations.is_empty() {
        recommendations.push("All checks passed; master record integrity confirmed".to_string());
    }
    recommendations
}
