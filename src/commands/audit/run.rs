use super::*;

pub fn run(args: AuditArgs) -> Result<GapStatus> {
    let paths = ArtifactPaths::new(&args.workspace);
    let report_path = args
        .report_path
        .unwrap_or_else(|| paths.gap_report_path.clone());
    let report = audit_workspace(&paths, &report_path)?;
    Ok(report.status)
}

pub fn audit_workspace(paths: &ArtifactPaths, report_path: &Path) -> Result<GapReport> {
    let unit_set = load_unit_set(&paths.units_path)?;
    let master = load_master_record(&paths.mapping_path)?;

    let report = build_gap_report(&unit_set.units, &master.rows);
    write_json_pretty(report_path, &report)?;

    let summary = &report.summary;
    match report.status {
        GapStatus::NoGapsDetected => info!(
            original_units = summary.original_units,
            mapped_units = summary.mapped_units,
            status = %report.status,
            path = %report_path.display(),
            "gap audit completed"
        ),
        GapStatus::WarningsDetected | GapStatus::CriticalGapsDetected => warn!(
            original_units = summary.original_units,
            mapped_units = summary.mapped_units,
            missing = summary.missing_uids,
            extra = summary.extra_uids,
            chapters_changed = summary.chapters_changed,
            text_mismatches = summary.text_mismatches,
            status = %report.status,
            path = %report_path.display(),
            "gap audit found problems"
        ),
    }
    for recommendation in &report.recommendations {
        info!(recommendation = %recommendation, "audit recommendation");
    }

    Ok(report)
}
