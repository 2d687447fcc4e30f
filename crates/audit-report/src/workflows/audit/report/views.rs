use serde::Serialize;

use super::super::domain::ScoreStatus;
use super::super::history::HistoricalValue;

/// Number of cycles shown side by side: the current one plus five trailing.
pub const TREND_CYCLES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendRowKind {
    Overall,
    Category,
    Section,
}

impl TrendRowKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Overall => "Overall",
            Self::Category => "Category",
            Self::Section => "Section",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendRow {
    pub label: String,
    pub kind: TrendRowKind,
    /// One value per column of [`TrendTable::cycles`], current cycle first.
    pub values: Vec<HistoricalValue>,
}

/// Current cycle against the trailing ones, newest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendTable {
    pub cycles: Vec<String>,
    pub rows: Vec<TrendRow>,
}

impl TrendTable {
    pub fn row(&self, label: &str) -> Option<&TrendRow> {
        self.rows.iter().find(|row| row.label == label)
    }
}

/// One bar of the score chart. Categories sit at depth 0 and their
/// sub-sections are indented under them.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeriesEntry {
    pub label: String,
    pub depth: u8,
    pub score: f64,
    pub threshold: f64,
    pub status: ScoreStatus,
    pub status_label: &'static str,
}

impl ChartSeriesEntry {
    pub fn is_category(&self) -> bool {
        self.depth == 0
    }

    /// Label with its indentation applied, as listed in text output.
    pub fn indented_label(&self) -> String {
        format!("{}{}", "  ".repeat(usize::from(self.depth)), self.label)
    }
}

/// Plain-text counterpart of the HTML report, used by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummaryView {
    pub document_id: String,
    pub store_name: String,
    pub audit_date: String,
    pub cycle_label: String,
    pub overall_score: f64,
    pub overall_status_label: &'static str,
    pub overall_threshold: f64,
    pub sections: Vec<SectionSummaryEntry>,
    pub categories: Vec<CategorySummaryEntry>,
    pub chart: Vec<ChartSeriesEntry>,
    pub corrective_actions: Vec<CorrectiveActionEntry>,
    pub trend: TrendTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectiveActionEntry {
    pub section: String,
    pub reference: String,
    pub finding: String,
    pub action: String,
    pub severity_label: &'static str,
    pub missing_after_evidence: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionSummaryEntry {
    pub title: String,
    pub score: f64,
    pub status_label: &'static str,
    pub corrective_actions: usize,
    pub placeholder: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummaryEntry {
    pub name: String,
    pub category_score: f64,
    pub sub_section_average: f64,
    pub status_label: &'static str,
}
