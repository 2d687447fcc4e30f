//! Prioritized accessors over loosely shaped upstream records.
//!
//! Upstream exports name the same attribute in several ways (`comment`,
//! `Comments`, `Note`, ...). Each logical field gets one accessor with an
//! ordered list of candidate keys and a documented default, so the mapping is
//! total and can be tested in isolation.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::domain::{AuditHeader, Choice, ResponseItem, Severity};

const ITEM_ID_KEYS: &[&str] = &["id", "ID", "Id", "questionId"];
const REFERENCE_KEYS: &[&str] = &["referenceValue", "Reference", "Ref", "reference"];
const CRITERIA_KEYS: &[&str] = &["criteriaText", "Criteria", "Question", "Title"];
const COEFFICIENT_KEYS: &[&str] = &["coefficient", "Coefficient", "Coef", "Weight"];
const CHOICE_KEYS: &[&str] = &["selectedChoice", "Choice", "Answer", "Response"];
const COMMENT_KEYS: &[&str] = &["comment", "Comments", "Note"];
const FINDING_KEYS: &[&str] = &["finding", "Finding", "Findings"];
const CORRECTIVE_ACTION_KEYS: &[&str] = &["correctiveActionText", "CorrectiveAction", "Action"];
const SEVERITY_KEYS: &[&str] = &["severity", "Severity", "Priority"];

const DOCUMENT_ID_KEYS: &[&str] = &["documentId", "DocumentId", "DocumentNumber"];
const STORE_ID_KEYS: &[&str] = &["storeId", "StoreId", "Store_x0020_ID", "StoreCode"];
const STORE_NAME_KEYS: &[&str] = &["storeName", "StoreName", "Store", "Title"];
const AUDIT_DATE_KEYS: &[&str] = &["auditDate", "AuditDate", "Date", "Created"];
const AUDITOR_KEYS: &[&str] = &["auditor", "Auditor", "AuditorName", "Author"];
const CYCLE_KEYS: &[&str] = &["cycleLabel", "Cycle", "AuditCycle", "Round"];
const OVERALL_SCORE_KEYS: &[&str] = &["overallScore", "OverallScore", "Score", "TotalScore"];

/// Placeholder shown for absent free-text fields.
pub const MISSING_TEXT: &str = "-";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("record is missing required field '{0}'")]
    Missing(&'static str),
    #[error("field '{field}' holds non-numeric value '{value}'")]
    NotNumeric { field: String, value: String },
}

/// An upstream record as received, before any field mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// First candidate key holding a non-null, non-blank value.
    pub fn first_present(&self, keys: &[&'static str]) -> Option<(&'static str, &Value)> {
        keys.iter().find_map(|key| {
            self.0
                .get(*key)
                .filter(|value| !is_blank(value))
                .map(|value| (*key, value))
        })
    }

    pub fn text(&self, keys: &[&'static str]) -> Option<String> {
        self.first_present(keys).map(|(_, value)| value_to_text(value))
    }

    pub fn text_or(&self, keys: &[&'static str], default: &str) -> String {
        self.text(keys).unwrap_or_else(|| default.to_string())
    }

    /// Numeric field; accepts numbers and numeric strings (`"4"`, `"4,5"`).
    pub fn number(&self, keys: &[&'static str]) -> Result<Option<f64>, FieldError> {
        match self.first_present(keys) {
            None => Ok(None),
            Some((key, value)) => parse_number(value)
                .map(Some)
                .ok_or_else(|| FieldError::NotNumeric {
                    field: key.to_string(),
                    value: value_to_text(value),
                }),
        }
    }

    pub fn number_at(&self, key: &str) -> Result<Option<f64>, FieldError> {
        match self.0.get(key).filter(|value| !is_blank(value)) {
            None => Ok(None),
            Some(value) => parse_number(value)
                .map(Some)
                .ok_or_else(|| FieldError::NotNumeric {
                    field: key.to_string(),
                    value: value_to_text(value),
                }),
        }
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

pub fn item_id(record: &RawRecord) -> Result<String, FieldError> {
    record.text(ITEM_ID_KEYS).ok_or(FieldError::Missing("id"))
}

pub fn reference_value(record: &RawRecord) -> String {
    record.text_or(REFERENCE_KEYS, MISSING_TEXT)
}

pub fn criteria_text(record: &RawRecord) -> String {
    record.text_or(CRITERIA_KEYS, MISSING_TEXT)
}

pub fn coefficient(record: &RawRecord) -> Result<f64, FieldError> {
    Ok(record.number(COEFFICIENT_KEYS)?.unwrap_or(0.0))
}

pub fn choice(record: &RawRecord) -> Choice {
    record
        .text(CHOICE_KEYS)
        .map(|raw| Choice::parse(&raw))
        .unwrap_or(Choice::Unrecognized)
}

pub fn comment(record: &RawRecord) -> String {
    record.text_or(COMMENT_KEYS, MISSING_TEXT)
}

pub fn finding(record: &RawRecord) -> String {
    record.text_or(FINDING_KEYS, MISSING_TEXT)
}

pub fn corrective_action(record: &RawRecord) -> String {
    record.text_or(CORRECTIVE_ACTION_KEYS, MISSING_TEXT)
}

pub fn severity(record: &RawRecord) -> Option<Severity> {
    record
        .text(SEVERITY_KEYS)
        .and_then(|raw| Severity::parse(&raw))
}

/// Maps a raw response record into an unscored-then-derived item.
pub fn response_item(record: &RawRecord) -> Result<ResponseItem, FieldError> {
    let item = ResponseItem::new(item_id(record)?, coefficient(record)?, choice(record))
        .with_reference(reference_value(record))
        .with_criteria(criteria_text(record))
        .with_comment(comment(record))
        .with_finding(finding(record))
        .with_corrective_action(corrective_action(record))
        .with_severity(severity(record));
    Ok(item)
}

/// Maps the document record into header fields.
///
/// `score_keys` lists the section and category score fields the layout
/// expects; each readable one present on the record is copied into
/// `score_fields`. An unreadable score field is left out so only the
/// section that depends on it degrades.
pub fn audit_header<'a>(
    record: &RawRecord,
    requested_id: &str,
    score_keys: impl IntoIterator<Item = &'a str>,
) -> Result<AuditHeader, FieldError> {
    let document_id = record
        .text(DOCUMENT_ID_KEYS)
        .unwrap_or_else(|| requested_id.to_string());
    let store_name = record.text_or(STORE_NAME_KEYS, MISSING_TEXT);
    let store_id = record
        .text(STORE_ID_KEYS)
        .unwrap_or_else(|| store_name.clone());

    let mut score_fields = BTreeMap::new();
    for key in score_keys {
        match record.number_at(key) {
            Ok(Some(score)) => {
                score_fields.insert(key.to_string(), score);
            }
            Ok(None) => {}
            Err(err) => warn!(document_id = %document_id, %err, "ignoring unreadable score field"),
        }
    }

    Ok(AuditHeader {
        document_id,
        store_id,
        store_name,
        audit_date: record
            .text(AUDIT_DATE_KEYS)
            .and_then(|raw| parse_date(&raw)),
        auditor: record.text_or(AUDITOR_KEYS, MISSING_TEXT),
        cycle_label: record.text_or(CYCLE_KEYS, MISSING_TEXT),
        overall_score: record.number(OVERALL_SCORE_KEYS)?.unwrap_or(0.0),
        score_fields,
    })
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|number| number.is_finite())
}
