use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::domain::{
    AuditDocument, AuditHeader, Category, ScoredItem, Section, SubSectionSummary,
};
use super::evidence::EvidenceIndex;
use super::fetch::fetch_evidence;
use super::fields::{self, FieldError};
use super::history::{HistoricalAggregator, HistoricalValue};
use super::layout::{AuditLayout, CategorySpec, SectionKind, SectionSpec};
use super::report::views::{ChartSeriesEntry, TrendRow, TrendRowKind, TrendTable, TREND_CYCLES};
use super::scoring;
use super::sources::{
    AttachmentProvider, HistoricalSource, ResponseProvider, SourceError, TemperatureSource,
};
use super::temperature::TemperatureTable;
use super::thresholds::{ThresholdProvider, Thresholds};

pub const DEFAULT_ATTACHMENT_WORKERS: usize = 4;

/// Fatal failure of one report generation.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("a document id is required")]
    MissingDocumentId,
    #[error("audit document '{0}' not found")]
    DocumentNotFound(String),
    #[error("audit document '{document_id}' could not be read: {source}")]
    Source {
        document_id: String,
        #[source]
        source: SourceError,
    },
    #[error("audit document '{document_id}' has an unreadable header: {source}")]
    Header {
        document_id: String,
        #[source]
        source: FieldError,
    },
}

/// Failure confined to one section; the section degrades to "No Data".
#[derive(Debug, thiserror::Error)]
pub enum SectionError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("item {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: FieldError,
    },
}

/// Result of [`ReportAssembler::generate_report`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<AuditDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<AuditDocument, ReportError>> for ReportOutcome {
    fn from(result: Result<AuditDocument, ReportError>) -> Self {
        match result {
            Ok(document) => Self {
                success: true,
                document: Some(document),
                error: None,
            },
            Err(err) => Self {
                success: false,
                document: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// External collaborators a report is assembled from.
#[derive(Clone)]
pub struct ReportSources {
    pub responses: Arc<dyn ResponseProvider>,
    pub attachments: Arc<dyn AttachmentProvider>,
    pub temperatures: Arc<dyn TemperatureSource>,
    pub history: Arc<dyn HistoricalSource>,
}

impl ReportSources {
    /// Uses one value for every seam, e.g. a file bundle.
    pub fn from_shared<S>(source: Arc<S>) -> Self
    where
        S: ResponseProvider + AttachmentProvider + TemperatureSource + HistoricalSource + 'static,
    {
        Self {
            responses: source.clone(),
            attachments: source.clone(),
            temperatures: source.clone(),
            history: source,
        }
    }
}

/// Builds scored audit documents from the configured sources.
///
/// Each call to [`generate_report`](Self::generate_report) runs a sequential
/// pipeline with its own historical cache; only the threshold cache is shared
/// between calls.
pub struct ReportAssembler {
    sources: ReportSources,
    thresholds: Arc<ThresholdProvider>,
    layout: AuditLayout,
    attachment_workers: usize,
}

impl ReportAssembler {
    pub fn new(sources: ReportSources, thresholds: Arc<ThresholdProvider>, layout: AuditLayout) -> Self {
        Self {
            sources,
            thresholds,
            layout,
            attachment_workers: DEFAULT_ATTACHMENT_WORKERS,
        }
    }

    pub fn with_attachment_workers(mut self, workers: usize) -> Self {
        self.attachment_workers = workers.max(1);
        self
    }

    pub fn layout(&self) -> &AuditLayout {
        &self.layout
    }

    pub fn generate_report(&self, document_id: &str) -> ReportOutcome {
        let outcome = ReportOutcome::from(self.assemble(document_id));
        if let Some(error) = &outcome.error {
            warn!(document_id, %error, "report generation failed");
        }
        outcome
    }

    /// Typed variant of [`generate_report`](Self::generate_report).
    pub fn assemble(&self, document_id: &str) -> Result<AuditDocument, ReportError> {
        let document_id = document_id.trim();
        if document_id.is_empty() {
            return Err(ReportError::MissingDocumentId);
        }
        info!(document_id, "assembling audit report");

        let thresholds = self.thresholds.thresholds();
        let header = self.load_header(document_id)?;
        let evidence = self.load_evidence(&header.document_id);

        let mut temperature = None;
        let sections: Vec<Section> = self
            .layout
            .sections
            .iter()
            .map(|spec| {
                match self.build_section(spec, &header, &evidence, &thresholds) {
                    Ok((section, table)) => {
                        if table.is_some() {
                            temperature = table;
                        }
                        section
                    }
                    Err(err) => {
                        warn!(
                            document_id = %header.document_id,
                            section = %spec.key,
                            %err,
                            "section degraded to no data"
                        );
                        Section::placeholder(&spec.key, &spec.title, &spec.score_field)
                    }
                }
            })
            .collect();

        let categories: Vec<Category> = self
            .layout
            .categories
            .iter()
            .map(|spec| build_category(spec, &header, &sections, &thresholds))
            .collect();

        let mut history =
            HistoricalAggregator::new(self.sources.history.as_ref(), header.document_id.clone());
        let trend = self.build_trend(&mut history, &header, &sections, &categories);
        let overall_history = trend
            .rows
            .iter()
            .find(|row| row.kind == TrendRowKind::Overall)
            .map(|row| row.values.iter().skip(1).copied().collect())
            .unwrap_or_default();
        let chart_series = build_chart_series(&categories, &sections, &thresholds);

        let document = AuditDocument {
            overall_status: scoring::score_status(header.overall_score, thresholds.overall),
            document_id: header.document_id,
            store_id: header.store_id,
            store_name: header.store_name,
            audit_date: header.audit_date,
            auditor: header.auditor,
            cycle_label: header.cycle_label,
            overall_score: header.overall_score,
            overall_history,
            thresholds,
            sections,
            categories,
            temperature,
            trend,
            chart_series,
        };

        info!(
            document_id = %document.document_id,
            overall_score = document.overall_score,
            sections = document.sections.len(),
            corrective_actions = document.corrective_action_count(),
            "audit report assembled"
        );
        Ok(document)
    }

    fn load_header(&self, document_id: &str) -> Result<AuditHeader, ReportError> {
        let record = self
            .sources
            .responses
            .document(document_id)
            .map_err(|source| match source {
                SourceError::NotFound(_) => ReportError::DocumentNotFound(document_id.to_string()),
                other => ReportError::Source {
                    document_id: document_id.to_string(),
                    source: other,
                },
            })?;

        fields::audit_header(&record, document_id, self.layout.score_fields()).map_err(|source| {
            ReportError::Header {
                document_id: document_id.to_string(),
                source,
            }
        })
    }

    fn load_evidence(&self, document_id: &str) -> EvidenceIndex {
        let attachments = match self.sources.attachments.attachments(document_id) {
            Ok(attachments) => attachments,
            Err(err) => {
                warn!(document_id, %err, "attachment listing failed; report has no evidence");
                return EvidenceIndex::default();
            }
        };

        let images = fetch_evidence(
            self.sources.attachments.as_ref(),
            &attachments,
            self.attachment_workers,
        );
        EvidenceIndex::new(images)
    }

    fn build_section(
        &self,
        spec: &SectionSpec,
        header: &AuditHeader,
        evidence: &EvidenceIndex,
        thresholds: &Thresholds,
    ) -> Result<(Section, Option<TemperatureTable>), SectionError> {
        let (items, computed_score, table) = match spec.kind {
            SectionKind::Standard => {
                let items = self.scored_items(spec, &header.document_id, evidence)?;
                let responses: Vec<_> = items.iter().map(|entry| entry.item.clone()).collect();
                (items, scoring::calculate_section_score(&responses), None)
            }
            SectionKind::Temperature => {
                let table = TemperatureTable::load(
                    self.sources.responses.as_ref(),
                    self.sources.temperatures.as_ref(),
                    &header.document_id,
                    &spec.key,
                )?;
                (Vec::new(), table.compliance_rate(), Some(table))
            }
        };

        let score = match header.score_fields.get(&spec.score_field) {
            Some(score) => *score,
            None => {
                debug!(
                    section = %spec.key,
                    field = %spec.score_field,
                    computed_score,
                    "score field absent; using computed score"
                );
                computed_score
            }
        };

        let section = Section {
            key: spec.key.clone(),
            title: spec.title.clone(),
            score_field_key: spec.score_field.clone(),
            items,
            score,
            computed_score,
            status: scoring::score_status(score, thresholds.section),
            placeholder: false,
        };
        Ok((section, table))
    }

    fn scored_items(
        &self,
        spec: &SectionSpec,
        document_id: &str,
        evidence: &EvidenceIndex,
    ) -> Result<Vec<ScoredItem>, SectionError> {
        let records = self.sources.responses.section_items(document_id, &spec.key)?;
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let item = fields::response_item(record)
                    .map_err(|source| SectionError::Item { index, source })?;
                let needs_corrective_action = scoring::needs_corrective_action(&item);
                let (before, after) = evidence.cells_for(&item.id, needs_corrective_action);
                Ok(ScoredItem {
                    severity: scoring::resolve_severity(&item),
                    needs_corrective_action,
                    before,
                    after,
                    item,
                })
            })
            .collect()
    }

    fn build_trend(
        &self,
        history: &mut HistoricalAggregator<'_>,
        header: &AuditHeader,
        sections: &[Section],
        categories: &[Category],
    ) -> TrendTable {
        let store_id = header.store_id.as_str();
        let trailing = history.trailing_cycles(
            store_id,
            &self.layout.cycles,
            &header.cycle_label,
            TREND_CYCLES - 1,
        );

        let mut cycles = Vec::with_capacity(TREND_CYCLES);
        cycles.push(header.cycle_label.clone());
        cycles.extend(trailing.iter().cloned());

        let mut rows = Vec::with_capacity(1 + categories.len() + sections.len());

        let mut values = vec![HistoricalValue::Score(header.overall_score)];
        values.extend(
            trailing
                .iter()
                .map(|cycle| history.overall_score_for_cycle(store_id, cycle)),
        );
        rows.push(TrendRow {
            label: TrendRowKind::Overall.label().to_string(),
            kind: TrendRowKind::Overall,
            values,
        });

        for category in categories {
            let titles: Vec<&str> = category
                .sub_sections
                .iter()
                .map(|sub| sub.title.as_str())
                .collect();
            let mut values = vec![HistoricalValue::Score(category.category_score)];
            values.extend(
                trailing
                    .iter()
                    .map(|cycle| history.category_historical_average(store_id, &titles, cycle)),
            );
            rows.push(TrendRow {
                label: category.name.clone(),
                kind: TrendRowKind::Category,
                values,
            });
        }

        for section in sections {
            let mut values = vec![HistoricalValue::Score(section.score)];
            values.extend(
                trailing
                    .iter()
                    .map(|cycle| history.score_for_section(store_id, &section.title, cycle)),
            );
            rows.push(TrendRow {
                label: section.title.clone(),
                kind: TrendRowKind::Section,
                values,
            });
        }

        TrendTable { cycles, rows }
    }
}

fn build_category(
    spec: &CategorySpec,
    header: &AuditHeader,
    sections: &[Section],
    thresholds: &Thresholds,
) -> Category {
    let by_key: HashMap<&str, &Section> = sections
        .iter()
        .map(|section| (section.key.as_str(), section))
        .collect();

    let sub_sections: Vec<SubSectionSummary> = spec
        .section_keys
        .iter()
        .filter_map(|key| by_key.get(key.as_str()))
        .map(|section| SubSectionSummary {
            key: section.key.clone(),
            title: section.title.clone(),
            score: section.score,
            status: section.status,
        })
        .collect();

    let scored: Vec<f64> = sub_sections
        .iter()
        .map(|sub| sub.score)
        .filter(|score| *score > 0.0)
        .collect();
    let sub_section_average = if scored.is_empty() {
        0.0
    } else {
        (scored.iter().sum::<f64>() / scored.len() as f64).round()
    };

    // Never derived from the sub-sections; the two may disagree.
    let category_score = header
        .score_fields
        .get(&spec.score_field)
        .copied()
        .unwrap_or(0.0);

    Category {
        name: spec.name.clone(),
        score_field_key: spec.score_field.clone(),
        category_score,
        status: scoring::score_status(category_score, thresholds.category),
        sub_section_average,
        sub_sections,
    }
}

fn build_chart_series(
    categories: &[Category],
    sections: &[Section],
    thresholds: &Thresholds,
) -> Vec<ChartSeriesEntry> {
    let mut series = Vec::with_capacity(categories.len() + sections.len());
    for category in categories {
        series.push(ChartSeriesEntry {
            label: category.name.clone(),
            depth: 0,
            score: category.category_score,
            threshold: thresholds.category,
            status: category.status,
            status_label: category.status.label(),
        });
        for sub in &category.sub_sections {
            series.push(ChartSeriesEntry {
                label: sub.title.clone(),
                depth: 1,
                score: sub.score,
                threshold: thresholds.section,
                status: sub.status,
                status_label: sub.status.label(),
            });
        }
    }
    series
}
