use super::common::*;
use crate::workflows::audit::domain::ScoreStatus;
use crate::workflows::audit::evidence::EvidenceCell;
use crate::workflows::audit::history::HistoricalValue;
use crate::workflows::audit::report::views::TrendRowKind;
use crate::workflows::audit::sources::SourceError;
use crate::workflows::audit::thresholds::{PartialThresholds, Thresholds};
use crate::workflows::audit::ReportError;
use serde_json::json;
use std::sync::atomic::Ordering;

fn scored_audit(extra_header: serde_json::Value) -> InMemoryAudit {
    InMemoryAudit::default()
        .with_document(DOCUMENT_ID, header(extra_header))
        .with_section(
            "hygiene",
            vec![
                answer("11", "1.1", 2.0, "Yes"),
                answer("12", "1.2", 4.0, "No"),
            ],
        )
}

#[test]
fn section_score_and_corrective_rows_follow_answers() {
    let (assembler, _) = assembler(scored_audit(json!({})));

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    let hygiene = document.section("hygiene").expect("hygiene section");

    assert_eq!(hygiene.score, 33.0);
    assert_eq!(hygiene.computed_score, 33.0);
    assert_eq!(hygiene.status, ScoreStatus::Fail);

    let corrective: Vec<&str> = hygiene
        .corrective_items()
        .map(|entry| entry.item.reference_value.as_str())
        .collect();
    assert_eq!(corrective, vec!["1.2"]);
    assert_eq!(hygiene.compliant_items().count(), 1);
}

#[test]
fn fully_compliant_section_has_no_corrective_rows() {
    let audit = InMemoryAudit::default()
        .with_document(DOCUMENT_ID, header(json!({})))
        .with_section(
            "hygiene",
            vec![
                answer("11", "1.1", 2.0, "Yes"),
                answer("12", "1.2", 4.0, "Yes"),
                answer("13", "1.3", 3.0, "NA"),
            ],
        );
    let (assembler, _) = assembler(audit);

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    let hygiene = document.section("hygiene").expect("hygiene section");
    assert_eq!(hygiene.score, 100.0);
    assert_eq!(hygiene.corrective_items().count(), 0);
    assert_eq!(document.corrective_action_count(), 0);
}

#[test]
fn upstream_section_score_is_authoritative() {
    let (assembler, _) = assembler(scored_audit(json!({ "HygieneScore": 95 })));

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    let hygiene = document.section("hygiene").expect("hygiene section");
    assert_eq!(hygiene.score, 95.0);
    assert_eq!(hygiene.computed_score, 33.0);
    assert_eq!(hygiene.status, ScoreStatus::Pass);
}

#[test]
fn missing_document_fails_without_partial_report() {
    let (assembler, _) = assembler(scored_audit(json!({})));

    let outcome = assembler.generate_report("DOC-404");
    assert!(!outcome.success);
    assert!(outcome.document.is_none());
    assert!(outcome
        .error
        .as_deref()
        .is_some_and(|message| message.contains("DOC-404")));

    assert!(matches!(
        assembler.assemble("DOC-404"),
        Err(ReportError::DocumentNotFound(id)) if id == "DOC-404"
    ));
    assert!(matches!(
        assembler.assemble("  "),
        Err(ReportError::MissingDocumentId)
    ));
}

#[test]
fn successful_outcome_carries_the_document() {
    let (assembler, _) = assembler(scored_audit(json!({})));
    let outcome = assembler.generate_report(DOCUMENT_ID);
    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(
        outcome.document.map(|document| document.store_name),
        Some("Downtown Bistro".to_string())
    );
}

#[test]
fn failing_section_degrades_to_placeholder() {
    let audit = scored_audit(json!({ "StorageScore": 80 })).with_failing_section(
        "storage",
        SourceError::Unavailable("list throttled".to_string()),
    );
    let (assembler, _) = assembler(audit);

    let document = assembler.assemble(DOCUMENT_ID).expect("report still assembles");
    let storage = document.section("storage").expect("storage placeholder");
    assert!(storage.placeholder);
    assert_eq!(storage.score, 0.0);
    assert_eq!(storage.status, ScoreStatus::NoData);
    assert!(storage.items.is_empty());

    let hygiene = document.section("hygiene").expect("hygiene section");
    assert!(!hygiene.placeholder);
    assert_eq!(hygiene.items.len(), 2);
}

#[test]
fn unreadable_answer_degrades_only_its_section() {
    let audit = scored_audit(json!({})).with_section(
        "storage",
        vec![record(json!({ "ID": "21", "Coefficient": "heavy", "Answer": "Yes" }))],
    );
    let (assembler, _) = assembler(audit);

    let document = assembler.assemble(DOCUMENT_ID).expect("report still assembles");
    assert!(document.section("storage").expect("storage").placeholder);
    assert!(!document.section("hygiene").expect("hygiene").placeholder);
}

#[test]
fn category_score_is_read_not_recomputed() {
    let audit = scored_audit(json!({
        "OperationsScore": 70,
        "HygieneScore": 95,
        "StorageScore": 85,
        "TemperatureScore": 90
    }));
    let (assembler, _) = assembler(audit);

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    let category = &document.categories[0];
    assert_eq!(category.name, "Operations");
    assert_eq!(category.category_score, 70.0);
    assert_eq!(category.sub_section_average, 90.0);
    assert_eq!(category.status, ScoreStatus::Fail);
    assert_eq!(category.sub_sections.len(), 3);
}

#[test]
fn category_without_upstream_score_has_no_data() {
    let (assembler, _) = assembler(scored_audit(json!({ "HygieneScore": 95 })));
    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    assert_eq!(document.categories[0].category_score, 0.0);
    assert_eq!(document.categories[0].status, ScoreStatus::NoData);
}

#[test]
fn chart_series_indents_sub_sections_under_categories() {
    let (assembler, _) = assembler(scored_audit(json!({ "OperationsScore": 88 })));
    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");

    let labels: Vec<String> = document
        .chart_series
        .iter()
        .map(|entry| entry.indented_label())
        .collect();
    assert_eq!(
        labels,
        vec!["Operations", "  Hygiene", "  Storage", "  Temperature"]
    );
    assert!(document.chart_series[0].is_category());
    assert_eq!(document.chart_series[0].threshold, 83.0);
    assert_eq!(document.chart_series[1].threshold, 89.0);
}

#[test]
fn trend_compares_trailing_cycles_and_excludes_current_document() {
    let audit = scored_audit(json!({ "HygieneScore": 92 })).with_history(vec![
        past_audit(DOCUMENT_ID, "Cycle 2", (2025, 5, 1), 10.0, &[("Hygiene", 10.0)]),
        past_audit("DOC-0", "Cycle 2", (2025, 3, 9), 81.0, &[("Hygiene", 80.0)]),
        past_audit("DOC-00", "Cycle 1", (2025, 1, 9), 75.0, &[("Hygiene", 70.0)]),
    ]);
    let (assembler, audit) = assembler(audit);

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    let trend = &document.trend;
    assert_eq!(
        trend.cycles,
        vec!["Cycle 3", "Cycle 2", "Cycle 1", "Cycle 6", "Cycle 5", "Cycle 4"]
    );

    let overall = trend.row("Overall").expect("overall row");
    assert_eq!(overall.kind, TrendRowKind::Overall);
    assert_eq!(
        overall.values,
        vec![
            HistoricalValue::Score(86.0),
            HistoricalValue::Score(81.0),
            HistoricalValue::Score(75.0),
            HistoricalValue::NoData,
            HistoricalValue::NoData,
            HistoricalValue::NoData,
        ]
    );
    assert_eq!(document.overall_history, overall.values[1..].to_vec());

    let hygiene = trend.row("Hygiene").expect("hygiene row");
    let labels: Vec<String> = hygiene.values.iter().map(|value| value.display_label()).collect();
    assert_eq!(labels, vec!["92", "80", "70", "-", "-", "-"]);

    let category = trend.row("Operations").expect("category row");
    assert_eq!(category.values[1], HistoricalValue::Score(80.0));

    assert_eq!(audit.history_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unavailable_history_renders_as_no_data() {
    let audit = scored_audit(json!({})).with_history_unavailable();
    let (assembler, _) = assembler(audit);

    let outcome = assembler.generate_report(DOCUMENT_ID);
    assert!(outcome.success);
    let document = outcome.document.expect("document present");
    assert!(document
        .trend
        .rows
        .iter()
        .all(|row| row.values[1..].iter().all(|value| value.is_no_data())));
}

#[test]
fn evidence_is_split_into_before_and_after_cells() {
    let audit = InMemoryAudit::default()
        .with_document(DOCUMENT_ID, header(json!({})))
        .with_section(
            "hygiene",
            vec![
                answer("87", "2.1", 4.0, "No"),
                answer("88", "2.2", 2.0, "Yes"),
            ],
        )
        .with_attachment(photo("DOC-1-87", false, "doc-1/87-before.jpg"), Some(b"before".as_slice()))
        .with_attachment(photo("DOC-1-88", false, "doc-1/88.png"), Some(b"ok".as_slice()))
        .with_attachment(photo("DOC-1-88", true, "doc-1/88-after.jpg"), None);
    let (assembler, audit) = assembler(audit);

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    let hygiene = document.section("hygiene").expect("hygiene section");

    let flagged = &hygiene.items[0];
    assert!(flagged.needs_corrective_action);
    assert_eq!(flagged.before.images().len(), 1);
    assert_eq!(flagged.after, EvidenceCell::MissingAfter);

    let met = &hygiene.items[1];
    assert!(met.before.images()[0].src.starts_with("data:image/png;base64,"));
    assert_eq!(met.after, EvidenceCell::NoEvidence);

    assert_eq!(audit.binary_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn unreachable_threshold_source_uses_defaults() {
    let audit = scored_audit(json!({}));
    let (assembler, _) = assembler_with_thresholds(
        audit,
        Err(SourceError::Unavailable("threshold list offline".to_string())),
    );

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    assert_eq!(document.thresholds, Thresholds::default());
    assert_eq!(document.overall_status, ScoreStatus::Pass);
}

#[test]
fn configured_thresholds_drive_statuses() {
    let audit = scored_audit(json!({}));
    let (assembler, _) = assembler_with_thresholds(
        audit,
        Ok(PartialThresholds {
            overall: Some(90.0),
            section: Some(30.0),
            category: None,
        }),
    );

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    assert_eq!(document.overall_status, ScoreStatus::Fail);
    assert_eq!(
        document.section("hygiene").expect("hygiene").status,
        ScoreStatus::Pass
    );
    assert_eq!(document.thresholds.category, 83.0);
}

#[test]
fn temperature_section_takes_its_own_path() {
    let audit = scored_audit(json!({}))
        .with_reference("temperature", "4.1")
        .with_temperatures(
            vec![reading("Walk-in cooler", 7.5)],
            vec![reading("Reach-in", 3.0), reading("Freezer", -18.0)],
        );
    let (assembler, _) = assembler(audit);

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    let section = document.section("temperature").expect("temperature section");
    assert!(section.items.is_empty());
    assert_eq!(section.score, 67.0);

    let table = document.temperature.as_ref().expect("temperature table");
    assert_eq!(table.reference_value, "4.1");
    assert_eq!(table.findings.len(), 1);
    assert_eq!(table.compliant.len(), 2);
}

#[test]
fn temperature_section_prefers_upstream_score() {
    let audit = scored_audit(json!({ "TemperatureScore": 90 }))
        .with_temperatures(vec![reading("Walk-in cooler", 7.5)], Vec::new());
    let (assembler, _) = assembler(audit);

    let document = assembler.assemble(DOCUMENT_ID).expect("report assembles");
    let section = document.section("temperature").expect("temperature section");
    assert_eq!(section.score, 90.0);
    assert_eq!(section.computed_score, 0.0);
    assert_eq!(
        document.temperature.map(|table| table.reference_value),
        Some("-".to_string())
    );
}
