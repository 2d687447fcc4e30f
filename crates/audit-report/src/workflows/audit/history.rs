//! Cross-cycle comparison values for sections, categories and the overall
//! score.
//!
//! Missing history is carried as [`HistoricalValue::NoData`], which keeps the
//! upstream sentinel `"0.1"` as its textual form so it can never be mistaken
//! for a genuine zero.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use super::domain::HistoricalRecord;
use super::layout::CycleCalendar;
use super::scoring::format_score;
use super::sources::HistoricalSource;

/// Textual marker for "no historical data". Real scores are whole numbers
/// between 0 and 100, so this value cannot collide with one.
pub const NO_DATA_SENTINEL: &str = "0.1";
pub const NO_DATA_DISPLAY: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoricalValue {
    Score(f64),
    NoData,
}

impl HistoricalValue {
    /// Reads a stored comparison value; the sentinel and anything
    /// non-numeric mean no data.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == NO_DATA_SENTINEL {
            return Self::NoData;
        }
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|score| score.is_finite())
            .map_or(Self::NoData, Self::Score)
    }

    pub fn score(self) -> Option<f64> {
        match self {
            Self::Score(score) => Some(score),
            Self::NoData => None,
        }
    }

    pub fn is_no_data(self) -> bool {
        matches!(self, Self::NoData)
    }

    /// Label shown in tables: the sentinel, and only the sentinel, becomes `-`.
    pub fn display_label(self) -> String {
        match self {
            Self::Score(score) => format_score(score),
            Self::NoData => NO_DATA_DISPLAY.to_string(),
        }
    }
}

impl fmt::Display for HistoricalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score(score) => f.write_str(&format_score(*score)),
            Self::NoData => f.write_str(NO_DATA_SENTINEL),
        }
    }
}

impl From<Option<f64>> for HistoricalValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::NoData, Self::Score)
    }
}

impl Serialize for HistoricalValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Historical lookups for one report generation.
///
/// Records are fetched once per store on first use, ordered newest first by
/// audit date, and reused for every later query of the same report. The
/// document being generated is never treated as history.
pub struct HistoricalAggregator<'a> {
    source: &'a dyn HistoricalSource,
    current_document_id: String,
    cache: HashMap<String, Vec<HistoricalRecord>>,
}

impl<'a> HistoricalAggregator<'a> {
    pub fn new(source: &'a dyn HistoricalSource, current_document_id: impl Into<String>) -> Self {
        Self {
            source,
            current_document_id: current_document_id.into(),
            cache: HashMap::new(),
        }
    }

    pub fn score_for_section(
        &mut self,
        store_id: &str,
        section_title: &str,
        cycle_label: &str,
    ) -> HistoricalValue {
        self.first_match(store_id, cycle_label)
            .and_then(|record| section_score(record, section_title))
            .into()
    }

    pub fn overall_score_for_cycle(&mut self, store_id: &str, cycle_label: &str) -> HistoricalValue {
        self.first_match(store_id, cycle_label)
            .and_then(|record| record.overall_score)
            .into()
    }

    /// Rounded mean of the sub-sections that have history for the cycle.
    pub fn category_historical_average(
        &mut self,
        store_id: &str,
        sub_section_titles: &[&str],
        cycle_label: &str,
    ) -> HistoricalValue {
        let scores: Vec<f64> = sub_section_titles
            .iter()
            .filter_map(|title| {
                self.score_for_section(store_id, title, cycle_label)
                    .score()
            })
            .collect();

        if scores.is_empty() {
            return HistoricalValue::NoData;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        HistoricalValue::Score(mean.round())
    }

    /// Cycles to compare against, most recent first.
    ///
    /// Follows the calendar when it knows `current_cycle`; otherwise falls
    /// back to the distinct cycle labels found in the store's history.
    pub fn trailing_cycles(
        &mut self,
        store_id: &str,
        calendar: &CycleCalendar,
        current_cycle: &str,
        count: usize,
    ) -> Vec<String> {
        if let Some(labels) = calendar.trailing(current_cycle, count) {
            return labels;
        }

        let current = normalize(current_cycle);
        let mut labels: Vec<String> = Vec::with_capacity(count);
        for record in self.records(store_id) {
            let label = record.cycle_label.trim();
            if label.is_empty()
                || normalize(label) == current
                || labels.iter().any(|seen| seen.eq_ignore_ascii_case(label))
            {
                continue;
            }
            labels.push(label.to_string());
            if labels.len() == count {
                break;
            }
        }
        labels
    }

    fn first_match(&mut self, store_id: &str, cycle_label: &str) -> Option<&HistoricalRecord> {
        let wanted = normalize(cycle_label);
        if wanted.is_empty() || wanted == "-" {
            return None;
        }

        let current_document_id = self.current_document_id.clone();
        self.records(store_id).iter().find(|record| {
            record.document_id != current_document_id && cycle_matches(&record.cycle_label, &wanted)
        })
    }

    fn records(&mut self, store_id: &str) -> &[HistoricalRecord] {
        let source = self.source;
        self.cache
            .entry(store_id.to_string())
            .or_insert_with(|| match source.records_for_store(store_id) {
                Ok(mut records) => {
                    records.sort_by(|a, b| b.audit_date.cmp(&a.audit_date));
                    debug!(store_id, records = records.len(), "historical records cached");
                    records
                }
                Err(err) => {
                    warn!(store_id, %err, "historical lookup failed; comparisons show no data");
                    Vec::new()
                }
            })
    }
}

fn section_score(record: &HistoricalRecord, section_title: &str) -> Option<f64> {
    record.section_scores.get(section_title).copied().or_else(|| {
        record
            .section_scores
            .iter()
            .find(|(title, _)| title.trim().eq_ignore_ascii_case(section_title.trim()))
            .map(|(_, score)| *score)
    })
}

fn normalize(label: &str) -> String {
    label.trim().to_ascii_lowercase()
}

fn cycle_matches(record_label: &str, wanted: &str) -> bool {
    normalize(record_label).contains(wanted)
}
