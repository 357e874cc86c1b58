use super::*;

/// Structural metadata joined back from the unit set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEnrichment {
    pub chapter: u32,
    pub paragraph: u32,
    pub sentence: u32,
    pub kind: UnitKind,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRow {
    #[serde(flatten)]
    pub row: TransformedRow,
    pub batch_id: String,
    /// `None` when the uid has no unit in the unit set.
    pub source: Option<UnitEnrichment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedBatch {
    pub batch_id: String,
    pub recommendation: Recommendation,
    pub reason: String,
}

/// A result left out because it does not answer a batch of the current manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleResult {
    pub file: String,
    pub batch_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeWarnings {
    pub rejected_batches: Vec<RejectedBatch>,
    #[serde(default)]
    pub stale_results: Vec<StaleResult>,
    /// Current batches without a readable result produced for them.
    pub missing_results: Vec<String>,
    pub duplicate_uids: Vec<String>,
    pub unmatched_uids: Vec<String>,
}

impl MergeWarnings {
    pub fn count(&self) -> usize {
        self.rejected_batches.len()
            + self.stale_results.len()
            + self.missing_results.len()
            + self.duplicate_uids.len()
            + self.unmatched_uids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeError {
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterMetadata {
    pub total_units: usize,
    pub source_units: usize,
    pub batches_merged: usize,
    pub batches_rejected: usize,
    /// SHA-256 over the merged batch ids and rows.
    pub input_fingerprint: String,
}

/// Merged, ordered and enriched rows of every accepted batch. Carries no
/// wall-clock time, so identical inputs give a byte-identical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRecord {
    pub metadata: MasterMetadata,
    pub rows: Vec<MasterRow>,
    pub statistics: MergeStatistics,
    pub warnings: MergeWarnings,
    pub errors: Vec<MergeError>,
}

/// One file from the results directory, loaded or not.
#[derive(Debug)]
pub struct ResultFile {
    pub file_name: String,
    pub document: Result<BatchResultDocument, String>,
}

pub fn run(args: MergeArgs) -> Result<()> {
    let paths = ArtifactPaths::new(&args.workspace);
    merge_workspace(&paths)?;
    Ok(())
}

pub fn merge_workspace(paths: &ArtifactPaths) -> Result<MasterRecord> {
    let unit_set = load_unit_set(&paths.units_path)?;
    let results = collect_result_files(&paths.results_dir)?;

    let manifest = load_batch_manifest(&paths.batch_manifest_path)?;
    let batches = manifest
        .batches
        .iter()
        .map(|entry| load_batch(paths, &entry.batch_id))
        .collect::<Result<Vec<_>>>()?;

    let record = build_master_record(&unit_set.units, &batches, results);
    write_json_pretty(&paths.mapping_path, &record)?;

    for rejected in &record.warnings.rejected_batches {
        warn!(
            batch_id = %rejected.batch_id,
            recommendation = %rejected.recommendation,
            reason = %rejected.reason,
            "batch excluded from master record"
        );
    }
    for stale in &record.warnings.stale_results {
        warn!(
            file = %stale.file,
            batch_id = %stale.batch_id,
            reason = %stale.reason,
            "stale batch result left out of master record"
        );
    }
    for batch_id in &record.warnings.missing_results {
        warn!(batch_id = %batch_id, "no result for batch");
    }
    for uid in &record.warnings.duplicate_uids {
        warn!(uid = %uid, "uid already merged from an earlier batch");
    }
    for uid in &record.warnings.unmatched_uids {
        warn!(uid = %uid, "merged uid has no unit in the unit set");
    }
    for error in &record.errors {
        warn!(file = %error.file, error = %error.message, "unreadable batch result");
    }

    info!(
        rows = record.metadata.total_units,
        source_units = record.metadata.source_units,
        batches_merged = record.metadata.batches_merged,
        batches_rejected = record.metadata.batches_rejected,
        warnings = record.warnings.count(),
        errors = record.errors.len(),
        path = %paths.mapping_path.display(),
        "merge completed"
    );

    Ok(record)
}

pub fn load_master_record(path: &Path) -> Result<MasterRecord> {
    if !path.exists() {
        bail!(
            "master record not found at {}; run `zeroloss merge` first",
            path.display()
        );
    }
    read_json(path)
}

fn collect_result_files(results_dir: &Path) -> Result<Vec<ResultFile>> {
    if !results_dir.is_dir() {
        bail!("no batch result files found in {}", results_dir.display());
    }

    let mut file_names = Vec::new();
    for entry in fs::read_dir(results_dir)
        .with_context(|| format!("failed to list {}", results_dir.display()))?
    {
        let entry =
            entry.with_context(|| format!("failed to list {}", results_dir.display()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("BATCH_") && name.ends_with(".json") {
            file_names.push(name);
        }
    }
    if file_names.is_empty() {
        bail!("no batch result files found in {}", results_dir.display());
    }
    file_names.sort();

    Ok(file_names
        .into_iter()
        .map(|file_name| {
            let document = load_batch_result(&results_dir.join(&file_name))
                .map_err(|err| format!("{err:#}"));
            ResultFile {
                file_name,
                document,
            }
        })
        .collect())
}

/// Merges accepted results of the current `batches` in ascending file
/// order. A result is used only when it answers one of `batches` as it
/// stands now; anything else is reported as stale. The first row seen for
/// a uid wins; later ones are reported as duplicates.
pub fn build_master_record(
    units: &[Unit],
    batches: &[Batch],
    mut results: Vec<ResultFile>,
) -> MasterRecord {
    results.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let current = batches
        .iter()
        .map(|batch| (batch.batch_id.as_str(), batch))
        .collect::<HashMap<_, _>>();

    let mut warnings = MergeWarnings::default();
    let mut errors = Vec::new();
    let mut answered = HashSet::new();
    let mut merged_batches = Vec::new();
    let mut merged_uids = HashSet::new();
    let mut rows = Vec::new();

    for result in &results {
        let document = match &result.document {
            Ok(document) => document,
            Err(message) => {
                errors.push(MergeError {
                    file: result.file_name.clone(),
                    message: message.clone(),
                });
                if let Some(batch_id) = result.file_name.strip_suffix(".json") {
                    answered.insert(batch_id.to_string());
                }
                continue;
            }
        };

        let stale_reason = match current.get(document.batch_id.as_str()) {
            None => Some("batch is not listed in the current batch manifest"),
            Some(batch) if !document.answers(batch) => {
                Some("batch units changed since this result was produced")
            }
            Some(_) => None,
        };
        if let Some(reason) = stale_reason {
            warnings.stale_results.push(StaleResult {
                file: result.file_name.clone(),
                batch_id: document.batch_id.clone(),
                reason: reason.to_string(),
            });
            continue;
        }
        answered.insert(document.batch_id.clone());

        let recommendation = document.recommendation();
        if !recommendation.is_accepted() {
            warnings.rejected_batches.push(RejectedBatch {
                batch_id: document.batch_id.clone(),
                recommendation,
                reason: document.verification.reason.clone(),
            });
            continue;
        }

        merged_batches.push(document.batch_id.clone());
        for row in &document.parsed_rows {
            if !merged_uids.insert(row.uid.clone()) {
                warnings.duplicate_uids.push(row.uid.clone());
                continue;
            }
            rows.push(MasterRow {
                row: row.clone(),
                batch_id: document.batch_id.clone(),
                source: None,
            });
        }
    }

    warnings.missing_results = batches
        .iter()
        .filter(|batch| !answered.contains(&batch.batch_id))
        .map(|batch| batch.batch_id.clone())
        .collect();

    rows.sort_by(|a, b| uid_sort_key(&a.row.uid).cmp(&uid_sort_key(&b.row.uid)));

    let units_by_uid = units
        .iter()
        .map(|unit| (unit.uid.as_str(), unit))
        .collect::<HashMap<_, _>>();
    for row in &mut rows {
        match units_by_uid.get(row.row.uid.as_str()) {
            Some(unit) => {
                row.source = Some(UnitEnrichment {
                    chapter: unit.chapter,
                    paragraph: unit.paragraph,
                    sentence: unit.sentence,
                    kind: unit.kind,
                    word_count: unit.metadata.word_count,
                });
            }
            None => warnings.unmatched_uids.push(row.row.uid.clone()),
        }
    }

    let statistics = statistics::compute_statistics(&rows);
    let metadata = MasterMetadata {
        total_units: rows.len(),
        source_units: units.len(),
        batches_merged: merged_batches.len(),
        batches_rejected: warnings.rejected_batches.len(),
        input_fingerprint: fingerprint(&merged_batches, &rows),
    };

    MasterRecord {
        metadata,
        rows,
        statistics,
        warnings,
        errors,
    }
}

fn fingerprint(batch_ids: &[String], rows: &[MasterRow]) -> String {
    let mut input = String::new();
    for batch_id in batch_ids {
        input.push_str(batch_id);
        input.push('\n');
    }
    for row in rows {
        input.push_str(&row.row.uid);
        input.push('\u{1f}');
        input.push_str(&row.row.raw_sentence);
        input.push('\u{1f}');
        input.push_str(&row.row.narrative_purpose);
        for (kind, values) in &row.row.attributes {
            input.push('\u{1f}');
            input.push_str(kind.column_title());
            input.push('=');
            input.push_str(&values.join(","));
        }
        input.push('\n');
    }
    sha256_hex(input.as_bytes())
}
