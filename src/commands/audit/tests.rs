use super::*;
use crate::model::{TransformedRow, UnitKind, UnitMetadata, UnitPosition};
use crate::util::short_digest;

fn unit(chapter: u32, sentence: u32) -> Unit {
    let text = format!("Chapter {chapter} sentence {sentence} keeps the story moving.");
    Unit {
        uid: UnitPosition::new(chapter, 1, sentence).uid(),
        kind: UnitKind::Sentence,
        chapter,
        paragraph: 1,
        sentence,
        content_digest: short_digest(&text),
        metadata: UnitMetadata {
            word_count: text.split_whitespace().count(),
            ..UnitMetadata::default()
        },
        text,
    }
}

/// Five chapters of ten units each.
fn fifty_units() -> Vec<Unit> {
    (1..=5)
        .flat_map(|chapter| (1..=10).map(move |sentence| unit(chapter, sentence)))
        .collect()
}

fn mapped(uid: &str, text: &str) -> MasterRow {
    MasterRow {
        row: TransformedRow {
            uid: uid.to_string(),
            raw_sentence: text.to_string(),
            narrative_purpose: "Develops narrative".to_string(),
            attributes: Default::default(),
        },
        batch_id: "BATCH_0001".to_string(),
        source: None,
    }
}

fn exact_rows(units: &[Unit]) -> Vec<MasterRow> {
    units.iter().map(|unit| mapped(&unit.uid, &unit.text)).collect()
}

#[test]
fn complete_exact_mapping_has_no_gaps() {
    let units = fifty_units();
    let report = build_gap_report(&units, &exact_rows(&units));

    assert_eq!(report.status, GapStatus::NoGapsDetected);
    assert_eq!(report.summary.original_units, 50);
    assert_eq!(report.summary.mapped_units, 50);
    assert!(report.missing_from_mapping.is_empty());
    assert!(report.chapter_changes.is_empty());
    assert_eq!(report.recommendations.len(), 1);
}

#[test]
fn removing_one_uid_is_critical_and_lists_exactly_that_uid() {
    let units = fifty_units();
    let mut rows = exact_rows(&units);
    let removed = rows.remove(17);

    let report = build_gap_report(&units, &rows);
    assert_eq!(report.status, GapStatus::CriticalGapsDetected);
    assert_eq!(report.missing_from_mapping, vec![removed.row.uid.clone()]);
    assert_eq!(report.status.exit_code(), 2);
}

#[test]
fn chapter_drift_is_flagged_with_signed_difference() {
    let units = fifty_units();
    let mut rows = exact_rows(&units);
    let position = rows
        .iter()
        .position(|row| row.row.uid == "CH02-P001-S004")
        .expect("chapter two row");
    rows[position] = mapped("CH03-P001-S011", &units[position].text);

    let report = build_gap_report(&units, &rows);
    assert_eq!(report.status, GapStatus::CriticalGapsDetected);
    assert_eq!(
        report.chapter_changes,
        vec![
            ChapterChange {
                chapter: 2,
                original_count: 10,
                mapped_count: 9,
                difference: -1,
            },
            ChapterChange {
                chapter: 3,
                original_count: 10,
                mapped_count: 11,
                difference: 1,
            },
        ]
    );
    assert_eq!(report.extra_in_mapping, vec!["CH03-P001-S011"]);
}

#[test]
fn chapter_drift_is_critical_even_without_missing_uids() {
    let units = fifty_units();
    let mut rows = exact_rows(&units);
    rows.push(mapped(&units[12].uid, &units[12].text));

    let report = build_gap_report(&units, &rows);
    assert!(report.missing_from_mapping.is_empty());
    assert_eq!(report.status, GapStatus::CriticalGapsDetected);
    assert_eq!(report.chapter_changes.len(), 1);
    assert_eq!(report.chapter_changes[0].chapter, 2);
    assert_eq!(report.chapter_changes[0].difference, 1);
}

#[test]
fn text_mismatches_and_extra_uids_are_warnings() {
    let units = fifty_units();
    let mut rows = exact_rows(&units);
    rows[0].row.raw_sentence = "Something else entirely.".to_string();
    rows.push(mapped("not-a-uid", "Stray text."));

    let report = build_gap_report(&units, &rows);
    assert_eq!(report.status, GapStatus::WarningsDetected);
    assert_eq!(report.status.exit_code(), 0);
    assert_eq!(report.text_mismatches.len(), 1);
    assert!(report.text_mismatches[0].similarity < 1.0);
    assert_eq!(report.extra_in_mapping, vec!["not-a-uid"]);
    assert_eq!(report.unparseable_uids, vec!["not-a-uid"]);
    assert_eq!(report.recommendations.len(), 2);
}
