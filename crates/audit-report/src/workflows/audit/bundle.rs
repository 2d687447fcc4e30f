//! File-backed audit sources.
//!
//! Layout of a data directory:
//!
//! ```text
//! documents/<document id>.json   header, section answers, references,
//!                                attachment list and temperature log
//! attachments/<relative path>    evidence binaries
//! history.csv                    one row per past audit
//! thresholds.json                optional pass marks
//! layout.json                    optional report layout
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use super::domain::HistoricalRecord;
use super::evidence::{AttachmentSource, ImageAttachment};
use super::fields::{self, RawRecord};
use super::history::NO_DATA_SENTINEL;
use super::layout::{AuditLayout, LayoutError};
use super::sources::{
    AttachmentProvider, HistoricalSource, ResponseProvider, SourceError, TemperatureSource,
    ThresholdSource,
};
use super::temperature::TemperatureReading;
use super::thresholds::PartialThresholds;

const DOCUMENTS_DIR: &str = "documents";
const ATTACHMENTS_DIR: &str = "attachments";
const HISTORY_FILE: &str = "history.csv";
const THRESHOLDS_FILE: &str = "thresholds.json";
const LAYOUT_FILE: &str = "layout.json";

const STORE_ID_COLUMN: &str = "Store ID";
const DOCUMENT_ID_COLUMN: &str = "Document ID";
const CYCLE_COLUMN: &str = "Cycle";
const AUDIT_DATE_COLUMN: &str = "Audit Date";
const OVERALL_SCORE_COLUMN: &str = "Overall Score";

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("{0} does not exist")]
    NotFound(PathBuf),
    #[error("'{0}' is not a valid bundle name")]
    InvalidName(String),
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid layout in {path}: {source}")]
    Layout {
        path: PathBuf,
        #[source]
        source: LayoutError,
    },
    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl From<BundleError> for SourceError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::NotFound(_) => SourceError::NotFound(err.to_string()),
            BundleError::Io { .. } => SourceError::Unavailable(err.to_string()),
            BundleError::InvalidName(_)
            | BundleError::Json { .. }
            | BundleError::Layout { .. }
            | BundleError::Csv { .. } => SourceError::Malformed(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocumentBundle {
    document: RawRecord,
    #[serde(default)]
    sections: BTreeMap<String, Value>,
    #[serde(default)]
    references: BTreeMap<String, Value>,
    #[serde(default)]
    attachments: Vec<Value>,
    #[serde(default)]
    temperature: TemperatureLog,
}

#[derive(Debug, Default, Deserialize)]
struct TemperatureLog {
    #[serde(default)]
    findings: Value,
    #[serde(default)]
    compliant: Value,
}

/// Serves every collaborator seam from one data directory.
#[derive(Debug, Clone)]
pub struct BundleStore {
    root: PathBuf,
}

impl BundleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout override from `layout.json`, or the standard layout.
    pub fn layout(&self) -> Result<AuditLayout, BundleError> {
        let path = self.root.join(LAYOUT_FILE);
        if !path.exists() {
            return Ok(AuditLayout::standard());
        }
        let layout: AuditLayout = read_json(&path)?;
        layout
            .validate()
            .map_err(|source| BundleError::Layout { path, source })?;
        Ok(layout)
    }

    /// Whether the data directory can be served from.
    pub fn is_ready(&self) -> bool {
        self.root.join(DOCUMENTS_DIR).is_dir()
    }

    fn document_bundle(&self, document_id: &str) -> Result<DocumentBundle, BundleError> {
        if !is_safe_name(document_id) {
            return Err(BundleError::InvalidName(document_id.to_string()));
        }
        let path = self
            .root
            .join(DOCUMENTS_DIR)
            .join(format!("{document_id}.json"));
        read_json(&path)
    }

    fn attachment_path(&self, relative: &str) -> Result<PathBuf, BundleError> {
        let relative_path = Path::new(relative);
        let contained = relative_path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if relative.trim().is_empty() || !contained {
            return Err(BundleError::InvalidName(relative.to_string()));
        }
        Ok(self.root.join(ATTACHMENTS_DIR).join(relative_path))
    }
}

impl ResponseProvider for BundleStore {
    fn document(&self, document_id: &str) -> Result<RawRecord, SourceError> {
        Ok(self.document_bundle(document_id)?.document)
    }

    fn section_items(
        &self,
        document_id: &str,
        section_key: &str,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let bundle = self.document_bundle(document_id)?;
        match bundle.sections.get(section_key) {
            None | Some(Value::Null) => {
                debug!(document_id, section_key, "section has no answers in bundle");
                Ok(Vec::new())
            }
            Some(Value::Array(rows)) => rows
                .iter()
                .enumerate()
                .map(|(index, row)| {
                    RawRecord::from_value(row.clone()).ok_or_else(|| {
                        SourceError::Malformed(format!(
                            "section '{section_key}' row {index} is not an object"
                        ))
                    })
                })
                .collect(),
            Some(_) => Err(SourceError::Malformed(format!(
                "section '{section_key}' is not a list of answers"
            ))),
        }
    }

    fn reference_value(
        &self,
        document_id: &str,
        section_key: &str,
    ) -> Result<Option<String>, SourceError> {
        let bundle = self.document_bundle(document_id)?;
        Ok(bundle.references.get(section_key).and_then(|value| match value {
            Value::String(text) => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }))
    }
}

impl AttachmentProvider for BundleStore {
    fn attachments(&self, document_id: &str) -> Result<Vec<ImageAttachment>, SourceError> {
        let bundle = self.document_bundle(document_id)?;
        let attachments = bundle
            .attachments
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value::<ImageAttachment>(raw) {
                Ok(attachment) => Some(attachment),
                Err(err) => {
                    warn!(document_id, index, %err, "skipping unreadable attachment entry");
                    None
                }
            })
            .collect();
        Ok(attachments)
    }

    fn fetch_binary(&self, attachment: &ImageAttachment) -> Result<Vec<u8>, SourceError> {
        let relative = match &attachment.source {
            AttachmentSource::Path(path) => path,
            AttachmentSource::Url(url) => {
                return Err(SourceError::Malformed(format!(
                    "attachment '{}' is remote ({url})",
                    attachment.composite_id
                )))
            }
        };
        let path = self.attachment_path(relative)?;
        Ok(read_bytes(&path)?)
    }
}

impl TemperatureSource for BundleStore {
    fn findings(&self, document_id: &str) -> Result<Vec<TemperatureReading>, SourceError> {
        let bundle = self.document_bundle(document_id)?;
        readings(bundle.temperature.findings, "findings")
    }

    fn compliant(&self, document_id: &str) -> Result<Vec<TemperatureReading>, SourceError> {
        let bundle = self.document_bundle(document_id)?;
        readings(bundle.temperature.compliant, "compliant")
    }
}

impl ThresholdSource for BundleStore {
    fn thresholds(&self) -> Result<PartialThresholds, SourceError> {
        let path = self.root.join(THRESHOLDS_FILE);
        if !path.exists() {
            return Ok(PartialThresholds::default());
        }
        Ok(read_json(&path)?)
    }
}

impl HistoricalSource for BundleStore {
    fn records_for_store(&self, store_id: &str) -> Result<Vec<HistoricalRecord>, SourceError> {
        let path = self.root.join(HISTORY_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path).map_err(|source| BundleError::Io {
            path: path.clone(),
            source,
        })?;
        let records = parse_history(file).map_err(|source| BundleError::Csv { path, source })?;
        Ok(records
            .into_iter()
            .filter(|record| record.store_id == store_id.trim())
            .collect())
    }
}

/// Parses `history.csv`. Columns other than the fixed identity columns are
/// section scores keyed by section title; blank cells and the no-data
/// sentinel are left out.
pub fn parse_history<R: Read>(reader: R) -> Result<Vec<HistoricalRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for row in csv_reader.records() {
        let row = row?;
        let mut record = HistoricalRecord {
            store_id: String::new(),
            document_id: String::new(),
            cycle_label: String::new(),
            audit_date: None,
            section_scores: BTreeMap::new(),
            overall_score: None,
        };

        for (header, cell) in headers.iter().zip(row.iter()) {
            match header {
                STORE_ID_COLUMN => record.store_id = cell.to_string(),
                DOCUMENT_ID_COLUMN => record.document_id = cell.to_string(),
                CYCLE_COLUMN => record.cycle_label = cell.to_string(),
                AUDIT_DATE_COLUMN => record.audit_date = fields::parse_date(cell),
                OVERALL_SCORE_COLUMN => record.overall_score = parse_score(cell),
                title => {
                    if let Some(score) = parse_score(cell) {
                        record.section_scores.insert(title.to_string(), score);
                    }
                }
            }
        }

        if record.store_id.is_empty() {
            continue;
        }
        records.push(record);
    }

    Ok(records)
}

fn parse_score(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == NO_DATA_SENTINEL {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|score| score.is_finite())
}

fn readings(value: Value, list: &str) -> Result<Vec<TemperatureReading>, SourceError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(|err| {
        SourceError::Malformed(format!("temperature {list} list is unreadable: {err}"))
    })
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, BundleError> {
    fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            BundleError::NotFound(path.to_path_buf())
        } else {
            BundleError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn read_json<T>(path: &Path) -> Result<T, BundleError>
where
    T: for<'de> Deserialize<'de>,
{
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|source| BundleError::Json {
        path: path.to_path_buf(),
        source,
    })
}
