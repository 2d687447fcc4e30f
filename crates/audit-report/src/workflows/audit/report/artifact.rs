use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::super::domain::AuditDocument;

const MAX_SUFFIX: u32 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("unable to prepare report directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no free artifact name left for {0}")]
    Exhausted(String),
}

/// Writes one self-contained file per generated report.
///
/// Names are derived from the document id and generation date. An existing
/// file is never replaced; a numeric suffix is appended instead.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn write(
        &self,
        document: &AuditDocument,
        html: &str,
        generated_on: NaiveDate,
    ) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ArtifactError::Directory {
            path: self.output_dir.clone(),
            source,
        })?;

        let stem = artifact_stem(&document.document_id, generated_on);
        for attempt in 1..=MAX_SUFFIX {
            let file_name = if attempt == 1 {
                format!("{stem}.html")
            } else {
                format!("{stem}-{attempt}.html")
            };
            let path = self.output_dir.join(file_name);

            // create_new makes the existence check and the creation atomic.
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(ArtifactError::Write { path, source }),
            };

            file.write_all(html.as_bytes())
                .and_then(|()| file.flush())
                .map_err(|source| ArtifactError::Write {
                    path: path.clone(),
                    source,
                })?;

            info!(document_id = %document.document_id, path = %path.display(), "report artifact written");
            return Ok(path);
        }

        Err(ArtifactError::Exhausted(stem))
    }
}

/// `audit-<slug>-<YYYYMMDD>` for a document id and generation date.
pub fn artifact_stem(document_id: &str, generated_on: NaiveDate) -> String {
    format!(
        "audit-{}-{}",
        slugify(document_id),
        generated_on.format("%Y%m%d")
    )
}

fn slugify(raw: &str) -> String {
    let mut slug = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    let trimmed = slug.trim_matches('-').to_string();
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_slugifies_document_id() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 12).expect("valid date");
        assert_eq!(artifact_stem("DOC-1 / Store #14", date), "audit-doc-1-store-14-20250512");
        assert_eq!(artifact_stem("???", date), "audit-document-20250512");
    }
}
