use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::workflows::audit::domain::HistoricalRecord;
use crate::workflows::audit::evidence::{AttachmentSource, ImageAttachment};
use crate::workflows::audit::fields::RawRecord;
use crate::workflows::audit::layout::{
    AuditLayout, CategorySpec, CycleCalendar, SectionKind, SectionSpec,
};
use crate::workflows::audit::sources::{
    AttachmentProvider, HistoricalSource, ResponseProvider, SourceError, TemperatureSource,
    ThresholdSource,
};
use crate::workflows::audit::temperature::TemperatureReading;
use crate::workflows::audit::thresholds::{PartialThresholds, ThresholdProvider};
use crate::workflows::audit::{ReportAssembler, ReportSources};

pub(super) const DOCUMENT_ID: &str = "DOC-1";
pub(super) const STORE_ID: &str = "ST-14";

pub(super) fn record(value: Value) -> RawRecord {
    RawRecord::from_value(value).expect("object literal")
}

pub(super) fn header(extra: Value) -> RawRecord {
    let mut base = json!({
        "documentId": DOCUMENT_ID,
        "StoreCode": STORE_ID,
        "StoreName": "Downtown Bistro",
        "AuditDate": "2025-05-12",
        "Auditor": "R. Diallo",
        "Cycle": "Cycle 3",
        "OverallScore": 86
    });
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    record(base)
}

pub(super) fn answer(id: &str, reference: &str, coefficient: f64, choice: &str) -> RawRecord {
    record(json!({
        "ID": id,
        "Reference": reference,
        "Criteria": format!("Criterion {reference}"),
        "Coefficient": coefficient,
        "Answer": choice,
        "Findings": format!("Finding {reference}"),
        "CorrectiveAction": format!("Fix {reference}")
    }))
}

pub(super) fn layout() -> AuditLayout {
    let section = |key: &str, title: &str, field: &str, kind| SectionSpec {
        key: key.to_string(),
        title: title.to_string(),
        score_field: field.to_string(),
        kind,
    };
    AuditLayout {
        sections: vec![
            section("hygiene", "Hygiene", "HygieneScore", SectionKind::Standard),
            section("storage", "Storage", "StorageScore", SectionKind::Standard),
            section(
                "temperature",
                "Temperature",
                "TemperatureScore",
                SectionKind::Temperature,
            ),
        ],
        categories: vec![CategorySpec {
            name: "Operations".to_string(),
            score_field: "OperationsScore".to_string(),
            section_keys: vec![
                "hygiene".to_string(),
                "storage".to_string(),
                "temperature".to_string(),
            ],
        }],
        cycles: CycleCalendar::bi_monthly(),
    }
}

pub(super) fn past_audit(
    document_id: &str,
    cycle: &str,
    date: (i32, u32, u32),
    overall: f64,
    scores: &[(&str, f64)],
) -> HistoricalRecord {
    HistoricalRecord {
        store_id: STORE_ID.to_string(),
        document_id: document_id.to_string(),
        cycle_label: cycle.to_string(),
        audit_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
        section_scores: scores
            .iter()
            .map(|(title, score)| (title.to_string(), *score))
            .collect::<BTreeMap<_, _>>(),
        overall_score: Some(overall),
    }
}

pub(super) fn photo(composite_id: &str, corrective: bool, path: &str) -> ImageAttachment {
    ImageAttachment::new(
        composite_id,
        corrective,
        AttachmentSource::Path(path.to_string()),
    )
}

pub(super) fn reading(equipment: &str, measured: f64) -> TemperatureReading {
    TemperatureReading {
        equipment: equipment.to_string(),
        product: "Dairy".to_string(),
        measured: Some(measured),
        limit: "≤ 4 °C".to_string(),
        comment: "-".to_string(),
        corrective_action: "-".to_string(),
    }
}

/// Mutex-backed stand-in for every upstream collaborator.
#[derive(Default)]
pub(super) struct InMemoryAudit {
    documents: Mutex<HashMap<String, RawRecord>>,
    sections: Mutex<HashMap<String, Result<Vec<RawRecord>, SourceError>>>,
    references: Mutex<HashMap<String, String>>,
    attachments: Mutex<Vec<ImageAttachment>>,
    binaries: Mutex<HashMap<String, Vec<u8>>>,
    findings: Mutex<Vec<TemperatureReading>>,
    compliant: Mutex<Vec<TemperatureReading>>,
    history: Mutex<Vec<HistoricalRecord>>,
    history_unavailable: Mutex<bool>,
    pub(super) history_calls: AtomicUsize,
    pub(super) binary_calls: AtomicUsize,
}

impl InMemoryAudit {
    pub(super) fn with_document(self, document_id: &str, header: RawRecord) -> Self {
        self.documents
            .lock()
            .expect("documents mutex poisoned")
            .insert(document_id.to_string(), header);
        self
    }

    pub(super) fn with_section(self, key: &str, answers: Vec<RawRecord>) -> Self {
        self.sections
            .lock()
            .expect("sections mutex poisoned")
            .insert(key.to_string(), Ok(answers));
        self
    }

    pub(super) fn with_failing_section(self, key: &str, error: SourceError) -> Self {
        self.sections
            .lock()
            .expect("sections mutex poisoned")
            .insert(key.to_string(), Err(error));
        self
    }

    pub(super) fn with_reference(self, key: &str, value: &str) -> Self {
        self.references
            .lock()
            .expect("references mutex poisoned")
            .insert(key.to_string(), value.to_string());
        self
    }

    pub(super) fn with_attachment(self, attachment: ImageAttachment, bytes: Option<&[u8]>) -> Self {
        if let (Some(bytes), AttachmentSource::Path(path)) = (bytes, &attachment.source) {
            self.binaries
                .lock()
                .expect("binaries mutex poisoned")
                .insert(path.clone(), bytes.to_vec());
        }
        self.attachments
            .lock()
            .expect("attachments mutex poisoned")
            .push(attachment);
        self
    }

    pub(super) fn with_temperatures(
        self,
        findings: Vec<TemperatureReading>,
        compliant: Vec<TemperatureReading>,
    ) -> Self {
        *self.findings.lock().expect("findings mutex poisoned") = findings;
        *self.compliant.lock().expect("compliant mutex poisoned") = compliant;
        self
    }

    pub(super) fn with_history(self, records: Vec<HistoricalRecord>) -> Self {
        *self.history.lock().expect("history mutex poisoned") = records;
        self
    }

    pub(super) fn with_history_unavailable(self) -> Self {
        *self
            .history_unavailable
            .lock()
            .expect("history flag mutex poisoned") = true;
        self
    }
}

impl ResponseProvider for InMemoryAudit {
    fn document(&self, document_id: &str) -> Result<RawRecord, SourceError> {
        self.documents
            .lock()
            .expect("documents mutex poisoned")
            .get(document_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(document_id.to_string()))
    }

    fn section_items(
        &self,
        _document_id: &str,
        section_key: &str,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.sections
            .lock()
            .expect("sections mutex poisoned")
            .get(section_key)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn reference_value(
        &self,
        _document_id: &str,
        section_key: &str,
    ) -> Result<Option<String>, SourceError> {
        Ok(self
            .references
            .lock()
            .expect("references mutex poisoned")
            .get(section_key)
            .cloned())
    }
}

impl AttachmentProvider for InMemoryAudit {
    fn attachments(&self, _document_id: &str) -> Result<Vec<ImageAttachment>, SourceError> {
        Ok(self
            .attachments
            .lock()
            .expect("attachments mutex poisoned")
            .clone())
    }

    fn fetch_binary(&self, attachment: &ImageAttachment) -> Result<Vec<u8>, SourceError> {
        self.binary_calls.fetch_add(1, Ordering::SeqCst);
        let AttachmentSource::Path(path) = &attachment.source else {
            return Err(SourceError::Malformed("remote attachment".to_string()));
        };
        self.binaries
            .lock()
            .expect("binaries mutex poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.clone()))
    }
}

impl TemperatureSource for InMemoryAudit {
    fn findings(&self, _document_id: &str) -> Result<Vec<TemperatureReading>, SourceError> {
        Ok(self.findings.lock().expect("findings mutex poisoned").clone())
    }

    fn compliant(&self, _document_id: &str) -> Result<Vec<TemperatureReading>, SourceError> {
        Ok(self
            .compliant
            .lock()
            .expect("compliant mutex poisoned")
            .clone())
    }
}

impl HistoricalSource for InMemoryAudit {
    fn records_for_store(&self, store_id: &str) -> Result<Vec<HistoricalRecord>, SourceError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if *self
            .history_unavailable
            .lock()
            .expect("history flag mutex poisoned")
        {
            return Err(SourceError::Unavailable("history list offline".to_string()));
        }
        Ok(self
            .history
            .lock()
            .expect("history mutex poisoned")
            .iter()
            .filter(|record| record.store_id == store_id)
            .cloned()
            .collect())
    }
}

/// Threshold source returning a fixed answer.
pub(super) struct FixedThresholds(pub(super) Result<PartialThresholds, SourceError>);

impl ThresholdSource for FixedThresholds {
    fn thresholds(&self) -> Result<PartialThresholds, SourceError> {
        self.0.clone()
    }
}

pub(super) fn assembler_with_thresholds(
    audit: InMemoryAudit,
    thresholds: Result<PartialThresholds, SourceError>,
) -> (ReportAssembler, Arc<InMemoryAudit>) {
    let audit = Arc::new(audit);
    let provider = ThresholdProvider::new(
        Arc::new(FixedThresholds(thresholds)),
        Duration::from_secs(300),
    );
    let assembler = ReportAssembler::new(
        ReportSources::from_shared(audit.clone()),
        Arc::new(provider),
        layout(),
    )
    .with_attachment_workers(2);
    (assembler, audit)
}

pub(super) fn assembler(audit: InMemoryAudit) -> (ReportAssembler, Arc<InMemoryAudit>) {
    assembler_with_thresholds(audit, Ok(PartialThresholds::default()))
}
