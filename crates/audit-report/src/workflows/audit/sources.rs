//! Collaborator seams the report engine reads through.
//!
//! Each trait is synchronous and object safe so the assembler can be driven
//! by in-memory fakes in tests and by the file-backed bundle store in the
//! service.

use super::domain::HistoricalRecord;
use super::evidence::ImageAttachment;
use super::fields::RawRecord;
use super::temperature::TemperatureReading;
use super::thresholds::PartialThresholds;

/// Error enumeration for collaborator failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed source data: {0}")]
    Malformed(String),
}

/// Audit responses: the document header and per-section answers.
pub trait ResponseProvider: Send + Sync {
    fn document(&self, document_id: &str) -> Result<RawRecord, SourceError>;
    fn section_items(
        &self,
        document_id: &str,
        section_key: &str,
    ) -> Result<Vec<RawRecord>, SourceError>;
    /// Reference value shared by every row of a section (e.g. a checklist
    /// clause number), when the upstream keeps one.
    fn reference_value(
        &self,
        document_id: &str,
        section_key: &str,
    ) -> Result<Option<String>, SourceError>;
}

/// Photographic evidence metadata and binaries.
pub trait AttachmentProvider: Send + Sync {
    fn attachments(&self, document_id: &str) -> Result<Vec<ImageAttachment>, SourceError>;
    fn fetch_binary(&self, attachment: &ImageAttachment) -> Result<Vec<u8>, SourceError>;
}

/// Temperature log kept apart from the checklist answers.
pub trait TemperatureSource: Send + Sync {
    fn findings(&self, document_id: &str) -> Result<Vec<TemperatureReading>, SourceError>;
    fn compliant(&self, document_id: &str) -> Result<Vec<TemperatureReading>, SourceError>;
}

pub trait ThresholdSource: Send + Sync {
    fn thresholds(&self) -> Result<PartialThresholds, SourceError>;
}

pub trait HistoricalSource: Send + Sync {
    fn records_for_store(&self, store_id: &str) -> Result<Vec<HistoricalRecord>, SourceError>;
}
