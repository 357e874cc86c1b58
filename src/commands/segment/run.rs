use std::collections::BTreeSet;

use super::*;

pub fn run(args: SegmentArgs) -> Result<()> {
    let paths = ArtifactPaths::new(&args.workspace);
    let document = segment_source(&args.source, &paths.units_path, args.force)?;

    let total_words = document
        .units
        .iter()
        .map(|unit| unit.metadata.word_count)
        .sum::<usize>();
    let average_words = if document.units.is_empty() {
        0.0
    } else {
        total_words as f64 / document.units.len() as f64
    };

    info!(
        units = document.metadata.total_units,
        chapters = document.metadata.total_chapters,
        average_words = %format!("{average_words:.1}"),
        path = %paths.units_path.display(),
        "segmentation completed"
    );

    Ok(())
}

/// Segments `source` into `units_path`, or reuses the existing unit set when
/// it was produced from a byte-identical source and `force` is not set.
pub fn segment_source(source: &Path, units_path: &Path, force: bool) -> Result<UnitSetDocument> {
    if !source.is_file() {
        bail!("source file not found: {}", source.display());
    }

    let source_sha256 = sha256_file(source)?;

    if !force && units_path.exists() {
        let existing = load_unit_set(units_path)?;
        if existing.metadata.source_sha256 == source_sha256 {
            info!(path = %units_path.display(), "reusing existing unit set");
            return Ok(existing);
        }
        info!(
            path = %units_path.display(),
            "source changed since last segmentation; segmenting again"
        );
    }

    let text = std::fs::read_to_string(source)
        .with_context(|| format!("failed to read source text {}", source.display()))?;

    let segmenter = Segmenter::new()?;
    let units = segmenter.segment(&text);
    let document = build_unit_set(source, source_sha256, units);

    write_json_pretty(units_path, &document)?;
    info!(
        path = %units_path.display(),
        units = document.units.len(),
        "wrote unit set"
    );

    Ok(document)
}

pub fn load_unit_set(path: &Path) -> Result<UnitSetDocument> {
    if !path.exists() {
        bail!(
            "unit set not found at {}; run `zeroloss segment` first",
            path.display()
        );
    }
    read_json(path)
}

fn build_unit_set(source: &Path, source_sha256: String, units: Vec<Unit>) -> UnitSetDocument {
    let total_chapters = units
        .iter()
        .map(|unit| unit.chapter)
        .collect::<BTreeSet<u32>>()
        .len();

    UnitSetDocument {
        metadata: UnitSetMetadata {
            manifest_version: UNIT_SET_VERSION,
            generated_at: now_utc_string(),
            source_file: source.display().to_string(),
            source_sha256,
            total_units: units.len(),
            total_chapters,
        },
        units,
    }
}
