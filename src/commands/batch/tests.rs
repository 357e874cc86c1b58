use std::collections::HashSet;

use super::*;
use crate::model::{UnitKind, UnitMetadata, UnitPosition};
use crate::util::short_digest;

fn sample_units(count: u32) -> Vec<Unit> {
    (1..=count)
        .map(|sentence| {
            let text = format!("Sentence number {sentence} moves the story along.");
            Unit {
                uid: UnitPosition::new(1, 1, sentence).uid(),
                kind: UnitKind::Sentence,
                chapter: 1,
                paragraph: 1,
                sentence,
                content_digest: short_digest(&text),
                metadata: UnitMetadata {
                    word_count: text.split_whitespace().count(),
                    ..UnitMetadata::default()
                },
                text,
            }
        })
        .collect()
}

#[test]
fn create_batches_partitions_units_without_loss_or_overlap() {
    let units = sample_units(37);
    let batches = create_batches(&units, 15).expect("batches");

    assert_eq!(batches.len(), 3);
    assert_eq!(
        batches.iter().map(|batch| batch.units_count).collect::<Vec<_>>(),
        vec![15, 15, 7]
    );
    assert_eq!(batches[0].batch_id, "BATCH_0001");
    assert_eq!(batches[2].batch_id, "BATCH_0003");
    assert!(batches.iter().all(|batch| batch.total_batches == 3));
    assert!(batches.iter().all(|batch| batch.status == BatchStatus::Pending));

    let flattened = batches
        .iter()
        .flat_map(|batch| batch.unit_uids())
        .collect::<Vec<_>>();
    let expected = units.iter().map(|unit| unit.uid.as_str()).collect::<Vec<_>>();
    assert_eq!(flattened, expected);

    let unique = flattened.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), units.len());
}

#[test]
fn create_batches_rejects_zero_batch_size() {
    let error = create_batches(&sample_units(3), 0).expect_err("zero batch size");
    assert!(error.to_string().contains("greater than zero"));
}

#[test]
fn create_batches_on_empty_unit_set_yields_no_batches() {
    let batches = create_batches(&[], 10).expect("batches");
    assert!(batches.is_empty());
}

#[test]
fn instruction_payload_lists_every_unit_in_order_and_is_deterministic() {
    let units = sample_units(4);
    let first = create_batches(&units, 4).expect("batches");
    let second = create_batches(&units, 4).expect("batches");
    assert_eq!(first, second);

    let payload = &first[0].instruction_payload;
    assert!(payload.contains(REQUIRED_TABLE_HEADER));
    assert!(payload.ends_with("Remember: One row per UID, no omissions, exact text copying."));

    let mut cursor = 0;
    for unit in &units {
        let line = format!("\n{}: {}", unit.uid, unit.text);
        let found = payload[cursor..]
            .find(&line)
            .unwrap_or_else(|| panic!("missing line for {}", unit.uid));
        cursor += found + line.len();
    }
}

#[test]
fn write_batches_persists_documents_and_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = ArtifactPaths::new(dir.path());
    let units = sample_units(5);
    let mut batches = create_batches(&units, 2).expect("batches");

    let mut manifest = write_batches(&paths, &batches, 2, units.len()).expect("write batches");
    assert_eq!(manifest.total_batches, 3);
    assert_eq!(manifest.total_units, 5);

    let loaded = load_batch(&paths, "BATCH_0002").expect("load batch");
    assert_eq!(loaded, batches[1]);

    update_batch_status(&paths, &mut manifest, &mut batches[1], BatchStatus::Rejected)
        .expect("update status");
    let reloaded = load_batch_manifest(&paths.batch_manifest_path).expect("manifest");
    assert_eq!(reloaded.batches[1].status, BatchStatus::Rejected);
    assert_eq!(
        load_batch(&paths, "BATCH_0002").expect("reload").status,
        BatchStatus::Rejected
    );
}
