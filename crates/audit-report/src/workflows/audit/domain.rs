use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::evidence::EvidenceCell;
use super::history::HistoricalValue;
use super::report::views::{ChartSeriesEntry, TrendTable};
use super::scoring;
use super::temperature::TemperatureTable;
use super::thresholds::Thresholds;

/// Answer recorded by the auditor for a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Yes,
    Partially,
    No,
    #[serde(rename = "na")]
    NotApplicable,
    Unrecognized,
}

impl Choice {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" | "oui" | "y" => Self::Yes,
            "partially" | "partial" | "partiellement" => Self::Partially,
            "no" | "non" | "n" => Self::No,
            "na" | "n/a" | "not applicable" | "non applicable" => Self::NotApplicable,
            _ => Self::Unrecognized,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::Partially => "Partially",
            Self::No => "No",
            Self::NotApplicable => "NA",
            Self::Unrecognized => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" | "major" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" | "minor" => Some(Self::Low),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Pass,
    Fail,
    NoData,
}

impl ScoreStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::NoData => "No Data",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Pass => "✅",
            Self::Fail => "❌",
            Self::NoData => "⚪",
        }
    }

    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Pass => "status-pass",
            Self::Fail => "status-fail",
            Self::NoData => "status-nodata",
        }
    }
}

/// One answered audit question.
///
/// `value` is derived from the choice and coefficient at construction and
/// cannot be set on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseItem {
    pub id: String,
    pub reference_value: String,
    pub criteria_text: String,
    coefficient: f64,
    selected_choice: Choice,
    pub comment: String,
    pub finding: String,
    pub corrective_action_text: String,
    pub severity: Option<Severity>,
    value: Option<f64>,
}

impl ResponseItem {
    pub fn new(id: impl Into<String>, coefficient: f64, selected_choice: Choice) -> Self {
        Self {
            id: id.into(),
            reference_value: "-".to_string(),
            criteria_text: "-".to_string(),
            coefficient,
            selected_choice,
            comment: "-".to_string(),
            finding: "-".to_string(),
            corrective_action_text: "-".to_string(),
            severity: None,
            value: scoring::calculate_value(selected_choice, coefficient),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_value = reference.into();
        self
    }

    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria_text = criteria.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_finding(mut self, finding: impl Into<String>) -> Self {
        self.finding = finding.into();
        self
    }

    pub fn with_corrective_action(mut self, action: impl Into<String>) -> Self {
        self.corrective_action_text = action.into();
        self
    }

    pub fn with_severity(mut self, severity: Option<Severity>) -> Self {
        self.severity = severity;
        self
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn selected_choice(&self) -> Choice {
        self.selected_choice
    }

    /// Weighted contribution; `None` for not-applicable answers.
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// A scored item together with its evidence cells.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: ResponseItem,
    pub severity: Severity,
    pub needs_corrective_action: bool,
    pub before: EvidenceCell,
    pub after: EvidenceCell,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    pub score_field_key: String,
    pub items: Vec<ScoredItem>,
    /// Authoritative score read from the audit document.
    pub score: f64,
    /// Bottom-up score from the items, kept for comparison only.
    pub computed_score: f64,
    pub status: ScoreStatus,
    pub placeholder: bool,
}

impl Section {
    /// "No Data" stand-in used when a section could not be processed.
    pub fn placeholder(key: &str, title: &str, score_field_key: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            score_field_key: score_field_key.to_string(),
            items: Vec::new(),
            score: 0.0,
            computed_score: 0.0,
            status: ScoreStatus::NoData,
            placeholder: true,
        }
    }

    pub fn corrective_items(&self) -> impl Iterator<Item = &ScoredItem> {
        self.items.iter().filter(|entry| entry.needs_corrective_action)
    }

    pub fn compliant_items(&self) -> impl Iterator<Item = &ScoredItem> {
        self.items
            .iter()
            .filter(|entry| !entry.needs_corrective_action)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubSectionSummary {
    pub key: String,
    pub title: String,
    pub score: f64,
    pub status: ScoreStatus,
}

/// Category roll-up.
///
/// `category_score` always comes from the upstream category field; the
/// sub-section average is reported next to it and may disagree.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub name: String,
    pub score_field_key: String,
    pub category_score: f64,
    pub status: ScoreStatus,
    pub sub_section_average: f64,
    pub sub_sections: Vec<SubSectionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub store_id: String,
    pub document_id: String,
    pub cycle_label: String,
    pub audit_date: Option<NaiveDate>,
    pub section_scores: BTreeMap<String, f64>,
    pub overall_score: Option<f64>,
}

/// Header fields of the audit being reported on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditHeader {
    pub document_id: String,
    pub store_id: String,
    pub store_name: String,
    pub audit_date: Option<NaiveDate>,
    pub auditor: String,
    pub cycle_label: String,
    pub overall_score: f64,
    /// Upstream score fields keyed by their field name.
    pub score_fields: BTreeMap<String, f64>,
}

/// Fully assembled report; immutable once returned by the assembler.
#[derive(Debug, Clone, Serialize)]
pub struct AuditDocument {
    pub document_id: String,
    pub store_id: String,
    pub store_name: String,
    pub audit_date: Option<NaiveDate>,
    pub auditor: String,
    pub cycle_label: String,
    pub overall_score: f64,
    pub overall_status: ScoreStatus,
    pub overall_history: Vec<HistoricalValue>,
    pub thresholds: Thresholds,
    pub sections: Vec<Section>,
    pub categories: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<TemperatureTable>,
    pub trend: TrendTable,
    pub chart_series: Vec<ChartSeriesEntry>,
}

impl AuditDocument {
    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.key == key)
    }

    pub fn corrective_action_count(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.corrective_items().count())
            .sum()
    }
}
