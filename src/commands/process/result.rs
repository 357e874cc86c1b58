use super::*;

/// Everything known about one transformation attempt of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResultDocument {
    pub batch_id: String,
    /// [`Batch::content_fingerprint`] of the batch this response answered.
    #[serde(default)]
    pub batch_fingerprint: String,
    pub processed_at: String,
    pub adapter: AdapterRecord,
    pub raw_response: String,
    pub parsed_rows: Vec<TransformedRow>,
    pub verification: VerificationReport,
}

impl BatchResultDocument {
    pub fn new(
        batch: &Batch,
        adapter: AdapterRecord,
        raw_response: String,
        verification: Verification,
    ) -> Self {
        Self {
            batch_id: batch.batch_id.clone(),
            batch_fingerprint: batch.content_fingerprint(),
            processed_at: now_utc_string(),
            adapter,
            raw_response,
            parsed_rows: verification.rows,
            verification: verification.report,
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        self.verification.recommendation
    }

    /// Whether this result was produced for `batch` exactly as it stands now.
    pub fn answers(&self, batch: &Batch) -> bool {
        self.batch_id == batch.batch_id && self.batch_fingerprint == batch.content_fingerprint()
    }
}

pub fn write_batch_result(paths: &ArtifactPaths, document: &BatchResultDocument) -> Result<PathBuf> {
    let path = paths.result_path(&document.batch_id);
    write_json_pretty(&path, document)?;
    Ok(path)
}

pub fn load_batch_result(path: &Path) -> Result<BatchResultDocument> {
    read_json(path)
}
