use super::*;

pub fn run(args: BatchArgs) -> Result<()> {
    let paths = ArtifactPaths::new(&args.workspace);
    let unit_set = load_unit_set(&paths.units_path)?;

    let batches = create_batches(&unit_set.units, args.batch_size)?;
    let manifest = write_batches(&paths, &batches, args.batch_size, unit_set.units.len())?;

    log_processing_estimate(&unit_set.units, &manifest);

    if let Some(batch_id) = args.show.as_deref() {
        let batch = batches
            .iter()
            .find(|batch| batch.batch_id == batch_id)
            .with_context(|| format!("batch {batch_id} not found"))?;
        println!("{}", batch.instruction_payload);
    }

    Ok(())
}

/// Partitions `units` into consecutive slices of `batch_size`; batch `k`
/// (1-based) owns `units[(k - 1) * batch_size .. k * batch_size]`.
pub fn create_batches(units: &[Unit], batch_size: usize) -> Result<Vec<Batch>> {
    if batch_size == 0 {
        bail!("batch size must be greater than zero");
    }

    let total_batches = units.len().div_ceil(batch_size);
    let batches = units
        .chunks(batch_size)
        .enumerate()
        .map(|(index, slice)| {
            let batch_index = index + 1;
            Batch {
                batch_id: batch_id_for_index(batch_index),
                batch_index,
                total_batches,
                units_count: slice.len(),
                units: slice
                    .iter()
                    .map(|unit| BatchUnit {
                        uid: unit.uid.clone(),
                        text: unit.text.clone(),
                        content_digest: unit.content_digest.clone(),
                    })
                    .collect(),
                instruction_payload: render_instruction_payload(slice),
                status: BatchStatus::Pending,
            }
        })
        .collect();

    Ok(batches)
}

/// Writes one document per batch, then the manifest. Stale batch and result
/// files from an earlier, larger partition are left for the operator.
pub fn write_batches(
    paths: &ArtifactPaths,
    batches: &[Batch],
    batch_size: usize,
    total_units: usize,
) -> Result<BatchManifest> {
    for batch in batches {
        write_json_pretty(&paths.batch_path(&batch.batch_id), batch)?;
    }

    let manifest = BatchManifest {
        manifest_version: BATCH_MANIFEST_VERSION,
        generated_at: now_utc_string(),
        batch_size,
        total_batches: batches.len(),
        total_units,
        batches: batches
            .iter()
            .map(|batch| BatchManifestEntry {
                batch_id: batch.batch_id.clone(),
                units_count: batch.units_count,
                status: batch.status,
            })
            .collect(),
    };
    write_json_pretty(&paths.batch_manifest_path, &manifest)?;

    info!(
        batches = manifest.total_batches,
        batch_size,
        path = %paths.batches_dir.display(),
        "wrote batches"
    );

    Ok(manifest)
}

pub fn load_batch_manifest(path: &Path) -> Result<BatchManifest> {
    if !path.exists() {
        bail!(
            "batch manifest not found at {}; run `zeroloss batch` first",
            path.display()
        );
    }
    read_json(path)
}

pub fn load_batch(paths: &ArtifactPaths, batch_id: &str) -> Result<Batch> {
    let path = paths.batch_path(batch_id);
    if !path.exists() {
        bail!("batch document not found: {}", path.display());
    }
    read_json(&path)
}

/// Records a verification outcome on the batch document and in the manifest.
pub fn update_batch_status(
    paths: &ArtifactPaths,
    manifest: &mut BatchManifest,
    batch: &mut Batch,
    status: BatchStatus,
) -> Result<()> {
    batch.status = status;
    write_json_pretty(&paths.batch_path(&batch.batch_id), batch)?;

    match manifest
        .batches
        .iter_mut()
        .find(|entry| entry.batch_id == batch.batch_id)
    {
        Some(entry) => entry.status = status,
        None => warn!(batch_id = %batch.batch_id, "batch missing from manifest"),
    }
    write_json_pretty(&paths.batch_manifest_path, manifest)
}

fn log_processing_estimate(units: &[Unit], manifest: &BatchManifest) {
    if units.is_empty() {
        warn!("unit set is empty; no batches to process");
        return;
    }

    let average_words = units
        .iter()
        .map(|unit| unit.metadata.word_count)
        .sum::<usize>() as f64
        / units.len() as f64;
    let estimated_tokens = manifest.batch_size as f64 * average_words * 1.5;

    info!(
        total_units = units.len(),
        total_batches = manifest.total_batches,
        average_words = %format!("{average_words:.1}"),
        estimated_tokens_per_batch = %format!("{estimated_tokens:.0}"),
        "batch processing estimate"
    );
}
