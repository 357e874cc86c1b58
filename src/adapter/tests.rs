use super::*;
use crate::model::{BatchStatus, BatchUnit};

struct FailingAdapter;

impl TransformAdapter for FailingAdapter {
    fn name(&self) -> &str {
        "failing"
    }

    fn transform(&self, _batch: &Batch) -> TransformOutcome {
        TransformOutcome::Failure("connection refused".to_string())
    }
}

fn batch_with(texts: &[(&str, &str)]) -> Batch {
    Batch {
        batch_id: "BATCH_0001".to_string(),
        batch_index: 1,
        total_batches: 1,
        units_count: texts.len(),
        units: texts
            .iter()
            .map(|(uid, text)| BatchUnit {
                uid: (*uid).to_string(),
                text: (*text).to_string(),
                content_digest: String::new(),
            })
            .collect(),
        instruction_payload: String::new(),
        status: BatchStatus::Pending,
    }
}

#[test]
fn fallback_render_copies_uid_and_escapes_pipes() {
    let batch = batch_with(&[
        ("CH01-P001-S001", "Maya entered the factory | alone."),
        ("CH01-P002-S001", "The zombie raised its shield."),
    ]);
    let table = FallbackGenerator.render(&batch);
    let lines = table.lines().collect::<Vec<_>>();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("| UID | Raw Sentence |"));
    assert_eq!(
        lines[2],
        "| CH01-P001-S001 | Maya entered the factory \\| alone. | Establishes setting | Maya | Factory | N/A | N/A |"
    );
    assert_eq!(
        lines[3],
        "| CH01-P002-S001 | The zombie raised its shield. | Develops narrative | N/A | N/A | Zombie, Shield | N/A |"
    );
}

#[test]
fn fallback_names_are_deduplicated_in_first_seen_order() {
    let batch = batch_with(&[("CH01-P001-S001", "Jake saw Maya. Maya saw Jake, then Zeldina.")]);
    let table = FallbackGenerator.render(&batch);
    assert!(table.contains("| Jake, Maya, Zeldina |"));
}

#[test]
fn substitute_policy_replaces_failed_response_with_fallback_table() {
    let batch = batch_with(&[("CH01-P001-S001", "Maya walked in.")]);
    let response = obtain_response(&FailingAdapter, FallbackPolicy::Substitute, &batch);

    assert_eq!(response.text, FallbackGenerator.render(&batch));
    assert_eq!(response.record.adapter, "failing");
    assert_eq!(response.record.failure.as_deref(), Some("connection refused"));
    assert!(response.record.fallback_used);
}

#[test]
fn record_policy_keeps_failure_and_empty_response() {
    let batch = batch_with(&[("CH01-P001-S001", "Maya walked in.")]);
    let response = obtain_response(&FailingAdapter, FallbackPolicy::Record, &batch);

    assert!(response.text.is_empty());
    assert!(!response.record.fallback_used);
    assert!(response.record.failure.is_some());
}

#[test]
fn successful_adapter_response_is_passed_through() {
    let batch = batch_with(&[("CH01-P001-S001", "Maya walked in.")]);
    let response = obtain_response(&FallbackGenerator, FallbackPolicy::Record, &batch);

    assert_eq!(response.record.adapter, "fallback");
    assert_eq!(response.record.failure, None);
    assert!(!response.record.fallback_used);
    assert!(response.text.contains("CH01-P001-S001"));
}

#[test]
fn build_adapter_selects_fallback_generator() {
    let adapter = build_adapter(&AdapterConfig::fallback_only()).expect("adapter");
    assert_eq!(adapter.name(), "fallback");
}
