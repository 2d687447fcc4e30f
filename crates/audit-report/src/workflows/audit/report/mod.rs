mod artifact;
mod render;
mod summary;
pub mod views;

pub use artifact::{artifact_stem, ArtifactError, ArtifactWriter};
pub use render::{render_html, MISSING_AFTER_MARKER};
pub use views::ReportSummaryView;
