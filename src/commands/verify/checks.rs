use super::*;

/// Similarity below this is a major fidelity mismatch.
pub const MAJOR_MISMATCH_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessCheck {
    pub passed: bool,
    pub missing_uids: Vec<String>,
    pub duplicate_uids: Vec<String>,
    pub extra_uids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMismatch {
    pub uid: String,
    pub original: String,
    pub provided: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityCheck {
    pub passed: bool,
    pub major_mismatches: Vec<TextMismatch>,
    pub minor_mismatches: Vec<TextMismatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyField {
    pub uid: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureCheck {
    pub passed: bool,
    pub no_rows: bool,
    pub missing_required_columns: Vec<String>,
    pub missing_optional_columns: Vec<String>,
    pub empty_required_fields: Vec<EmptyField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub batch_id: String,
    pub expected_count: usize,
    pub found_count: usize,
    pub dropped_row_count: usize,
    /// Share of expected uids present at least once, as a percentage.
    pub completeness_rate: f64,
    pub completeness: CompletenessCheck,
    pub fidelity: FidelityCheck,
    pub structure: StructureCheck,
    pub warnings: Vec<String>,
    pub recommendation: Recommendation,
    pub reason: String,
}

pub(super) fn check_completeness(batch: &Batch, rows: &[TransformedRow]) -> CompletenessCheck {
    let expected = batch.unit_uids().collect::<HashSet<_>>();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *seen.entry(row.uid.as_str()).or_default() += 1;
    }

    let missing_uids = batch
        .unit_uids()
        .filter(|uid| !seen.contains_key(uid))
        .map(str::to_string)
        .collect::<Vec<_>>();
    let duplicate_uids = seen
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(uid, _)| (*uid).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    let extra_uids = seen
        .keys()
        .filter(|uid| !expected.contains(*uid))
        .map(|uid| (*uid).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    CompletenessCheck {
        passed: missing_uids.is_empty() && duplicate_uids.is_empty(),
        missing_uids,
        duplicate_uids,
        extra_uids,
    }
}

pub(super) fn check_fidelity(batch: &Batch, rows: &[TransformedRow]) -> FidelityCheck {
    let originals = batch
        .units
        .iter()
        .map(|unit| (unit.uid.as_str(), unit.text.as_str()))
        .collect::<HashMap<_, _>>();

    let mut major_mismatches = Vec::new();
    let mut minor_mismatches = Vec::new();

    for row in rows {
        let Some(original) = originals.get(row.uid.as_str()) else {
            continue;
        };
        if normalize_whitespace(original) == normalize_whitespace(&row.raw_sentence) {
            continue;
        }

        let mismatch = TextMismatch {
            uid: row.uid.clone(),
            original: (*original).to_string(),
            provided: row.raw_sentence.clone(),
            similarity: text_similarity(original, &row.raw_sentence),
        };
        if mismatch.similarity < MAJOR_MISMATCH_THRESHOLD {
            major_mismatches.push(mismatch);
        } else {
            minor_mismatches.push(mismatch);
        }
    }

    FidelityCheck {
        passed: major_mismatches.is_empty() && minor_mismatches.is_empty(),
        major_mismatches,
        minor_mismatches,
    }
}

pub(super) fn check_structure(table: &ParsedTable) -> StructureCheck {
    let missing_required_columns = TableColumn::REQUIRED
        .iter()
        .filter(|column| !table.has_column(**column))
        .map(|column| column.title().to_string())
        .collect::<Vec<_>>();
    let missing_optional_columns = TableColumn::OPTIONAL
        .iter()
        .filter(|column| !table.has_column(**column))
        .map(|column| column.title().to_string())
        .collect::<Vec<_>>();

    let mut empty_required_fields = Vec::new();
    for row in &table.rows {
        let required_values = [
            (TableColumn::Uid, row.uid.as_str()),
            (TableColumn::RawSentence, row.raw_sentence.as_str()),
            (TableColumn::NarrativePurpose, row.narrative_purpose.as_str()),
        ];
        for (column, value) in required_values {
            if table.has_column(column) && value.trim().is_empty() {
                empty_required_fields.push(EmptyField {
                    uid: row.uid.clone(),
                    column: column.title().to_string(),
                });
            }
        }
    }

    let no_rows = table.rows.is_empty();
    StructureCheck {
        passed: !no_rows && missing_required_columns.is_empty() && empty_required_fields.is_empty(),
        no_rows,
        missing_required_columns,
        missing_optional_columns,
        empty_required_fields,
    }
}

/// Applies the acceptance rule in priority order: completeness, structure,
/// then major and minor fidelity mismatches.
pub(super) fn decide(
    completeness: &CompletenessCheck,
    fidelity: &FidelityCheck,
    structure: &StructureCheck,
) -> (Recommendation, String) {
    if !completeness.passed {
        return (
            Recommendation::Reject,
            format!(
                "completeness failed: {} missing, {} duplicated",
                completeness.missing_uids.len(),
                completeness.duplicate_uids.len()
            ),
        );
    }
    if !structure.passed {
        let reason = if structure.no_rows {
            "structure failed: no table rows found".to_string()
        } else {
            format!(
                "structure failed: {} missing required columns, {} empty required fields",
                structure.missing_required_columns.len(),
                structure.empty_required_fields.len()
            )
        };
        return (Recommendation::Reject, reason);
    }
    if !fidelity.major_mismatches.is_empty() {
        return (
            Recommendation::Reject,
            format!(
                "fidelity failed: {} rows below similarity {MAJOR_MISMATCH_THRESHOLD}",
                fidelity.major_mismatches.len()
            ),
        );
    }
    if !fidelity.minor_mismatches.is_empty() {
        return (
            Recommendation::AcceptWithWarnings,
            format!(
                "{} rows with minor text differences",
                fidelity.minor_mismatches.len()
            ),
        );
    }
    (Recommendation::Accept, "all checks passed".to_string())
}

pub(super) fn collect_warnings(
    completeness: &CompletenessCheck,
    fidelity: &FidelityCheck,
    structure: &StructureCheck,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if !completeness.extra_uids.is_empty() {
        warnings.push(format!(
            "extra uids not in batch: {}",
            completeness.extra_uids.join(", ")
        ));
    }
    for mismatch in &fidelity.minor_mismatches {
        warnings.push(format!(
            "minor text difference for {} (similarity {:.3})",
            mismatch.uid, mismatch.similarity
        ));
    }
    if !structure.missing_optional_columns.is_empty() {
        warnings.push(format!(
            "missing optional columns: {}",
            structure.missing_optional_columns.join(", ")
        ));
    }
    warnings
}
