//! Food-safety audit scoring and report assembly.
//!
//! Raw answers, evidence photos and past audits come in through the traits in
//! [`sources`]; [`ReportAssembler`] turns them into an immutable
//! [`AuditDocument`] that the [`report`] module renders.

mod assembler;
pub mod bundle;
pub mod domain;
pub mod evidence;
mod fetch;
pub mod fields;
pub mod history;
pub mod layout;
pub mod report;
pub mod scoring;
pub mod sources;
pub mod temperature;
pub mod thresholds;

#[cfg(test)]
mod tests;

pub use assembler::{
    ReportAssembler, ReportError, ReportOutcome, ReportSources, SectionError,
    DEFAULT_ATTACHMENT_WORKERS,
};
pub use bundle::{BundleError, BundleStore};
pub use domain::{
    AuditDocument, Category, Choice, ResponseItem, ScoreStatus, ScoredItem, Section, Severity,
};
pub use evidence::{EvidenceCell, ImageAttachment};
pub use fetch::data_uri;
pub use history::{HistoricalAggregator, HistoricalValue};
pub use layout::AuditLayout;
pub use report::{render_html, ArtifactError, ArtifactWriter, ReportSummaryView};
pub use sources::SourceError;
pub use thresholds::{ThresholdProvider, Thresholds};
