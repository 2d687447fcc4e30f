use std::fmt;

use super::super::domain::AuditDocument;
use super::super::evidence::EvidenceCell;
use super::super::scoring::format_score;
use super::render::format_date;
use super::views::{
    CategorySummaryEntry, CorrectiveActionEntry, ReportSummaryView, SectionSummaryEntry,
};

impl ReportSummaryView {
    pub fn from_document(document: &AuditDocument) -> Self {
        let sections = document
            .sections
            .iter()
            .map(|section| SectionSummaryEntry {
                title: section.title.clone(),
                score: section.score,
                status_label: section.status.label(),
                corrective_actions: section.corrective_items().count(),
                placeholder: section.placeholder,
            })
            .collect();

        let categories = document
            .categories
            .iter()
            .map(|category| CategorySummaryEntry {
                name: category.name.clone(),
                category_score: category.category_score,
                sub_section_average: category.sub_section_average,
                status_label: category.status.label(),
            })
            .collect();

        let corrective_actions = document
            .sections
            .iter()
            .flat_map(|section| {
                section
                    .corrective_items()
                    .map(move |entry| CorrectiveActionEntry {
                        section: section.title.clone(),
                        reference: entry.item.reference_value.clone(),
                        finding: entry.item.finding.clone(),
                        action: entry.item.corrective_action_text.clone(),
                        severity_label: entry.severity.label(),
                        missing_after_evidence: entry.after == EvidenceCell::MissingAfter,
                    })
            })
            .collect();

        Self {
            document_id: document.document_id.clone(),
            store_name: document.store_name.clone(),
            audit_date: format_date(document.audit_date),
            cycle_label: document.cycle_label.clone(),
            overall_score: document.overall_score,
            overall_status_label: document.overall_status.label(),
            overall_threshold: document.thresholds.overall,
            sections,
            categories,
            chart: document.chart_series.clone(),
            corrective_actions,
            trend: document.trend.clone(),
        }
    }
}

impl fmt::Display for ReportSummaryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} | {} | {} | {}",
            self.store_name, self.document_id, self.audit_date, self.cycle_label
        )?;
        writeln!(
            f,
            "Overall: {}% ({}, threshold {}%)",
            format_score(self.overall_score),
            self.overall_status_label,
            format_score(self.overall_threshold)
        )?;

        if !self.chart.is_empty() {
            writeln!(f, "\nScores:")?;
            for entry in &self.chart {
                writeln!(
                    f,
                    "  {:<40} {:>5}  {}",
                    entry.indented_label(),
                    format_score(entry.score),
                    entry.status_label
                )?;
            }
        }

        if !self.categories.is_empty() {
            writeln!(f, "\nCategory vs sub-section average:")?;
            for category in &self.categories {
                writeln!(
                    f,
                    "  {:<40} {:>5} / {:>5}",
                    category.name,
                    format_score(category.category_score),
                    format_score(category.sub_section_average)
                )?;
            }
        }

        writeln!(f, "\nSections:")?;
        for section in &self.sections {
            let note = if section.placeholder { " (no data)" } else { "" };
            writeln!(
                f,
                "  {:<40} {:>5}  {}  corrective: {}{}",
                section.title,
                format_score(section.score),
                section.status_label,
                section.corrective_actions,
                note
            )?;
        }

        if !self.trend.cycles.is_empty() {
            writeln!(f, "\nTrend ({}):", self.trend.cycles.join(" | "))?;
            for row in &self.trend.rows {
                let values: Vec<String> = row.values.iter().map(|value| value.display_label()).collect();
                writeln!(f, "  {:<40} {}", row.label, values.join(" | "))?;
            }
        }

        if self.corrective_actions.is_empty() {
            writeln!(f, "\nNo corrective actions required.")?;
        } else {
            writeln!(f, "\nCorrective actions:")?;
            for action in &self.corrective_actions {
                let marker = if action.missing_after_evidence {
                    " [after photo missing]"
                } else {
                    ""
                };
                writeln!(
                    f,
                    "  [{}] {} {}: {} -> {}{}",
                    action.severity_label,
                    action.section,
                    action.reference,
                    action.finding,
                    action.action,
                    marker
                )?;
            }
        }

        Ok(())
    }
}
