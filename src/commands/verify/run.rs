use super::*;

/// Parsed rows of one response together with the verdict on them.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub rows: Vec<TransformedRow>,
    pub report: VerificationReport,
}

/// Runs parsing and the three checks for one batch. Malformed responses
/// produce a rejecting report, never an error.
pub fn verify_batch(batch: &Batch, response: &str) -> Verification {
    let table = parse_table(response);

    let completeness = checks::check_completeness(batch, &table.rows);
    let fidelity = checks::check_fidelity(batch, &table.rows);
    let structure = checks::check_structure(&table);
    let (recommendation, reason) = checks::decide(&completeness, &fidelity, &structure);
    let warnings = checks::collect_warnings(&completeness, &fidelity, &structure);

    let expected_count = batch.units.len();
    let matched = expected_count.saturating_sub(completeness.missing_uids.len());
    let completeness_rate = if expected_count == 0 {
        100.0
    } else {
        matched as f64 / expected_count as f64 * 100.0
    };

    if table.dropped_row_count > 0 {
        debug!(
            batch_id = %batch.batch_id,
            dropped = table.dropped_row_count,
            "malformed rows dropped while parsing response"
        );
    }

    let report = VerificationReport {
        batch_id: batch.batch_id.clone(),
        expected_count,
        found_count: table.rows.len(),
        dropped_row_count: table.dropped_row_count,
        completeness_rate,
        completeness,
        fidelity,
        structure,
        warnings,
        recommendation,
        reason,
    };

    Verification {
        rows: table.rows,
        report,
    }
}

pub fn run(args: VerifyArgs) -> Result<()> {
    let paths = ArtifactPaths::new(&args.workspace);
    let mut batch = load_batch(&paths, &args.batch)?;
    let response = std::fs::read_to_string(&args.response)
        .with_context(|| format!("failed to read response {}", args.response.display()))?;

    let verification = verify_batch(&batch, &response);
    let report = &verification.report;

    info!(
        batch_id = %report.batch_id,
        expected = report.expected_count,
        found = report.found_count,
        dropped = report.dropped_row_count,
        missing = report.completeness.missing_uids.len(),
        duplicates = report.completeness.duplicate_uids.len(),
        major_mismatches = report.fidelity.major_mismatches.len(),
        minor_mismatches = report.fidelity.minor_mismatches.len(),
        recommendation = %report.recommendation,
        reason = %report.reason,
        "verification completed"
    );
    for warning in &report.warnings {
        warn!(batch_id = %report.batch_id, warning = %warning, "verification warning");
    }

    let rendered =
        serde_json::to_string_pretty(report).context("failed to serialize verification report")?;
    println!("{rendered}");

    if args.save {
        let status = BatchStatus::from_recommendation(report.recommendation);
        let document = BatchResultDocument::new(
            &batch,
            AdapterRecord {
                adapter: "manual".to_string(),
                failure: None,
                fallback_used: false,
            },
            response,
            verification,
        );
        let result_path = write_batch_result(&paths, &document)?;

        let mut manifest = load_batch_manifest(&paths.batch_manifest_path)?;
        update_batch_status(&paths, &mut manifest, &mut batch, status)?;
        info!(path = %result_path.display(), status = status.as_str(), "saved batch result");
    }

    Ok(())
}
