use super::*;

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub fallback_policy: FallbackPolicy,
    /// Restrict processing to these batch ids; empty means every batch.
    pub only: Vec<String>,
    pub skip_accepted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub processed: usize,
    pub accepted: usize,
    pub accepted_with_warnings: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub units_verified: usize,
    pub fallback_used: usize,
    pub cancelled: bool,
}

pub fn run(args: ProcessArgs) -> Result<()> {
    let paths = ArtifactPaths::new(&args.workspace);
    let adapter_config = AdapterConfig::from_args(&args.adapter);
    let adapter = build_adapter(&adapter_config)?;

    info!(
        adapter = adapter.name(),
        endpoint = %adapter_config.endpoint,
        fallback_policy = adapter_config.fallback_policy.as_str(),
        "processing batches"
    );

    let options = ProcessOptions {
        fallback_policy: adapter_config.fallback_policy,
        only: args.only,
        skip_accepted: args.skip_accepted,
    };
    let summary = process_batches(
        &paths,
        adapter.as_ref(),
        &options,
        &CancelFlag::new(),
        &mut |_, _| Ok(()),
    )?;

    info!(
        processed = summary.processed,
        accepted = summary.accepted,
        accepted_with_warnings = summary.accepted_with_warnings,
        rejected = summary.rejected,
        skipped = summary.skipped,
        units_verified = summary.units_verified,
        fallback_used = summary.fallback_used,
        "batch processing completed"
    );

    Ok(())
}

/// Sends each selected batch through `adapter` in ascending id order,
/// verifies the response and persists the result before moving on.
///
/// `cancel` is checked before every submission; a batch already submitted
/// always runs to completion. `on_batch` sees progress after each batch.
pub fn process_batches(
    paths: &ArtifactPaths,
    adapter: &dyn TransformAdapter,
    options: &ProcessOptions,
    cancel: &CancelFlag,
    on_batch: &mut dyn FnMut(BatchProgress, &VerificationReport) -> Result<()>,
) -> Result<ProcessSummary> {
    let mut manifest = load_batch_manifest(&paths.batch_manifest_path)?;

    let known = manifest
        .batches
        .iter()
        .map(|entry| entry.batch_id.as_str())
        .collect::<HashSet<_>>();
    for batch_id in &options.only {
        if !known.contains(batch_id.as_str()) {
            bail!("unknown batch id {batch_id}; not listed in the batch manifest");
        }
    }

    let mut selected = manifest
        .batches
        .iter()
        .filter(|entry| options.only.is_empty() || options.only.contains(&entry.batch_id))
        .map(|entry| entry.batch_id.clone())
        .collect::<Vec<_>>();
    selected.sort();

    let mut summary = ProcessSummary::default();
    let mut progress = BatchProgress {
        completed: 0,
        total: selected.len(),
    };

    for batch_id in &selected {
        if cancel.is_cancelled() {
            info!(
                completed = progress.completed,
                total = progress.total,
                "cancellation observed; stopping before next batch"
            );
            summary.cancelled = true;
            break;
        }

        let mut batch = load_batch(paths, batch_id)?;

        if options.skip_accepted {
            if let Some(previous) = accepted_result(paths, &batch) {
                summary.skipped += 1;
                summary.units_verified += previous.verification.expected_count;
                progress.completed += 1;
                info!(batch_id = %batch_id, "skipping previously accepted batch");
                on_batch(progress, &previous.verification)?;
                continue;
            }
        }

        let response = obtain_response(adapter, options.fallback_policy, &batch);
        if response.record.fallback_used {
            summary.fallback_used += 1;
        }

        let verification = verify_batch(&batch, &response.text);
        let document =
            BatchResultDocument::new(&batch, response.record, response.text, verification);
        write_batch_result(paths, &document)?;

        let recommendation = document.recommendation();
        update_batch_status(
            paths,
            &mut manifest,
            &mut batch,
            BatchStatus::from_recommendation(recommendation),
        )?;

        summary.processed += 1;
        match recommendation {
            Recommendation::Accept => summary.accepted += 1,
            Recommendation::AcceptWithWarnings => summary.accepted_with_warnings += 1,
            Recommendation::Reject => summary.rejected += 1,
        }
        if recommendation.is_accepted() {
            summary.units_verified += document.verification.expected_count;
            info!(
                batch_id = %batch_id,
                units = document.verification.expected_count,
                recommendation = %recommendation,
                "batch accepted"
            );
        } else {
            warn!(
                batch_id = %batch_id,
                reason = %document.verification.reason,
                "batch rejected"
            );
        }

        progress.completed += 1;
        on_batch(progress, &document.verification)?;
    }

    Ok(summary)
}

fn accepted_result(paths: &ArtifactPaths, batch: &Batch) -> Option<BatchResultDocument> {
    let path = paths.result_path(&batch.batch_id);
    if !path.exists() {
        return None;
    }
    match load_batch_result(&path) {
        Ok(document) if !document.answers(batch) => {
            warn!(
                batch_id = %batch.batch_id,
                "existing result answers a different version of this batch; reprocessing"
            );
            None
        }
        Ok(document) if document.recommendation().is_accepted() => Some(document),
        Ok(_) => None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "unreadable batch result; reprocessing");
            None
        }
    }
}
