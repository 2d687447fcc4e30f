//! Photographic evidence: question grouping and before/after classification.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const COMPOSITE_SEPARATOR: char = '-';

/// Where the binary of an attachment lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Relative path resolved by the attachment provider.
    Path(String),
    /// Remote image referenced as-is in the report.
    Url(String),
}

/// Attachment metadata as listed by the upstream.
///
/// `question_id` is derived from `composite_id` on construction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawAttachment")]
pub struct ImageAttachment {
    pub composite_id: String,
    pub question_id: String,
    pub is_corrective: bool,
    pub file_name: String,
    pub source: AttachmentSource,
}

impl ImageAttachment {
    pub fn new(composite_id: impl Into<String>, is_corrective: bool, source: AttachmentSource) -> Self {
        let composite_id = composite_id.into();
        let file_name = match &source {
            AttachmentSource::Path(path) | AttachmentSource::Url(path) => path
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(path.as_str())
                .to_string(),
        };
        Self {
            question_id: question_id_for(&composite_id),
            composite_id,
            is_corrective,
            file_name,
            source,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawAttachment {
    #[serde(alias = "compositeId", alias = "CompositeId", alias = "Title")]
    composite_id: String,
    #[serde(
        default,
        alias = "isCorrective",
        alias = "IsCorrective",
        alias = "corrective",
        deserialize_with = "deserialize_corrective_flag"
    )]
    is_corrective: bool,
    #[serde(default, alias = "fileName", alias = "FileName")]
    file_name: Option<String>,
    #[serde(default, alias = "Path")]
    path: Option<String>,
    #[serde(default, alias = "Url", alias = "URL")]
    url: Option<String>,
}

impl TryFrom<RawAttachment> for ImageAttachment {
    type Error = String;

    fn try_from(raw: RawAttachment) -> Result<Self, Self::Error> {
        let source = match (raw.path, raw.url) {
            (Some(path), _) if !path.trim().is_empty() => AttachmentSource::Path(path),
            (_, Some(url)) if !url.trim().is_empty() => AttachmentSource::Url(url),
            _ => {
                return Err(format!(
                    "attachment '{}' has neither a path nor a url",
                    raw.composite_id
                ))
            }
        };

        let attachment = Self::new(raw.composite_id, raw.is_corrective, source);
        Ok(match raw.file_name.filter(|name| !name.trim().is_empty()) {
            Some(name) => attachment.with_file_name(name),
            None => attachment,
        })
    }
}

fn deserialize_corrective_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(corrective_flag(&value))
}

/// Tolerant reading of the corrective marker: `true`, `"true"` and `1`
/// count as corrective, everything else does not.
pub fn corrective_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        Value::Number(number) => number.as_f64() == Some(1.0),
        _ => false,
    }
}

/// Question a composite attachment id refers to.
///
/// Composite ids are `<document id>-<question id>`, and document ids carry
/// one separator of their own (`DOC-1`). The question id is the segment
/// after the last separator only when such a suffix exists; otherwise the
/// whole id is used.
pub fn question_id_for(composite_id: &str) -> String {
    let trimmed = composite_id.trim();
    if trimmed.matches(COMPOSITE_SEPARATOR).count() < 2 {
        return trimmed.to_string();
    }

    match trimmed.rsplit_once(COMPOSITE_SEPARATOR) {
        Some((_, suffix)) if !suffix.is_empty() => suffix.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Anything that can be filed against a question as before/after evidence.
pub trait Evidence {
    fn question_id(&self) -> &str;
    fn is_corrective(&self) -> bool;
}

impl Evidence for ImageAttachment {
    fn question_id(&self) -> &str {
        &self.question_id
    }

    fn is_corrective(&self) -> bool {
        self.is_corrective
    }
}

impl Evidence for EvidenceImage {
    fn question_id(&self) -> &str {
        &self.question_id
    }

    fn is_corrective(&self) -> bool {
        self.is_corrective
    }
}

/// Groups evidence by question id. Relative order inside a group follows
/// input order.
pub fn group_by_question<T, I>(evidence: I) -> BTreeMap<String, Vec<T>>
where
    T: Evidence,
    I: IntoIterator<Item = T>,
{
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for entry in evidence {
        groups
            .entry(entry.question_id().to_string())
            .or_default()
            .push(entry);
    }
    groups
}

pub fn filter_by_corrective<T>(evidence: &[T], want_corrective: bool) -> Vec<T>
where
    T: Evidence + Clone,
{
    evidence
        .iter()
        .filter(|entry| entry.is_corrective() == want_corrective)
        .cloned()
        .collect()
}

/// An image ready to embed: either a `data:` URI or a remote URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceImage {
    pub question_id: String,
    pub is_corrective: bool,
    pub caption: String,
    pub src: String,
}

/// Content of one evidence column in an item table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "images", rename_all = "snake_case")]
pub enum EvidenceCell {
    Gallery(Vec<EvidenceImage>),
    /// Nothing on file; rendered as a plain dash.
    NoEvidence,
    /// Corrective item without remediation photos; rendered as a warning.
    MissingAfter,
}

impl EvidenceCell {
    pub fn images(&self) -> &[EvidenceImage] {
        match self {
            Self::Gallery(images) => images,
            Self::NoEvidence | Self::MissingAfter => &[],
        }
    }
}

/// Builds a display cell from an already filtered image list.
///
/// `expects_after` marks the "after" column of an item that needs corrective
/// action, where an empty list is a gap rather than a neutral absence.
pub fn picture_cell(images: Vec<EvidenceImage>, expects_after: bool) -> EvidenceCell {
    if !images.is_empty() {
        EvidenceCell::Gallery(images)
    } else if expects_after {
        EvidenceCell::MissingAfter
    } else {
        EvidenceCell::NoEvidence
    }
}

/// Evidence of one document, grouped by question.
#[derive(Debug, Clone, Default)]
pub struct EvidenceIndex {
    by_question: BTreeMap<String, Vec<EvidenceImage>>,
}

impl EvidenceIndex {
    pub fn new(images: Vec<EvidenceImage>) -> Self {
        Self {
            by_question: group_by_question(images),
        }
    }

    pub fn len(&self) -> usize {
        self.by_question.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_question.is_empty()
    }

    /// Before and after cells for one question.
    pub fn cells_for(&self, question_id: &str, needs_corrective_action: bool) -> (EvidenceCell, EvidenceCell) {
        let images = self
            .by_question
            .get(question_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let before = picture_cell(filter_by_corrective(images, false), false);
        let after = picture_cell(filter_by_corrective(images, true), needs_corrective_action);
        (before, after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image(question_id: &str, is_corrective: bool) -> EvidenceImage {
        EvidenceImage {
            question_id: question_id.to_string(),
            is_corrective,
            caption: format!("{question_id}.jpg"),
            src: format!("https://cdn.example.test/{question_id}.jpg"),
        }
    }

    #[test]
    fn question_id_is_trailing_segment_of_composite_id() {
        assert_eq!(question_id_for("DOC-1-87"), "87");
        assert_eq!(question_id_for("DOC-1"), "DOC-1");
        assert_eq!(question_id_for("87"), "87");
        assert_eq!(question_id_for("DOC-1-"), "DOC-1-");
    }

    #[test]
    fn attachments_sharing_a_question_are_grouped() {
        let attachments = vec![
            ImageAttachment::new("DOC-1-87", false, AttachmentSource::Path("a.jpg".into())),
            ImageAttachment::new("DOC-1-87", true, AttachmentSource::Path("b.jpg".into())),
            ImageAttachment::new("DOC-1", false, AttachmentSource::Path("c.jpg".into())),
        ];

        let groups = group_by_question(attachments);
        assert_eq!(groups.get("87").map(Vec::len), Some(2));
        assert_eq!(groups.get("DOC-1").map(Vec::len), Some(1));
        assert_eq!(groups["87"][0].file_name, "a.jpg");
    }

    #[test]
    fn corrective_flag_accepts_heterogeneous_encodings() {
        assert!(corrective_flag(&json!(true)));
        assert!(corrective_flag(&json!("TRUE")));
        assert!(corrective_flag(&json!(1)));
        assert!(!corrective_flag(&json!(0)));
        assert!(!corrective_flag(&json!("yes")));
        assert!(!corrective_flag(&Value::Null));
    }

    #[test]
    fn attachment_deserializes_from_upstream_shape() {
        let attachment: ImageAttachment = serde_json::from_value(json!({
            "compositeId": "DOC-7-12",
            "IsCorrective": "true",
            "path": "photos/doc-7/12-after.png"
        }))
        .expect("attachment parses");

        assert_eq!(attachment.question_id, "12");
        assert!(attachment.is_corrective);
        assert_eq!(attachment.file_name, "12-after.png");
        assert_eq!(
            attachment.source,
            AttachmentSource::Path("photos/doc-7/12-after.png".to_string())
        );

        let missing_source = serde_json::from_value::<ImageAttachment>(json!({ "Title": "DOC-7-12" }));
        assert!(missing_source.is_err());
    }

    #[test]
    fn filter_splits_before_and_after_sets() {
        let images = vec![image("4", false), image("4", true), image("4", false)];
        assert_eq!(filter_by_corrective(&images, false).len(), 2);
        assert_eq!(filter_by_corrective(&images, true).len(), 1);
    }

    #[test]
    fn empty_after_cell_warns_only_for_corrective_items() {
        assert_eq!(picture_cell(Vec::new(), false), EvidenceCell::NoEvidence);
        assert_eq!(picture_cell(Vec::new(), true), EvidenceCell::MissingAfter);
        assert!(matches!(
            picture_cell(vec![image("1", true)], true),
            EvidenceCell::Gallery(ref images) if images.len() == 1
        ));
    }

    #[test]
    fn index_builds_before_and_after_cells() {
        let index = EvidenceIndex::new(vec![image("87", false), image("12", true)]);
        assert_eq!(index.len(), 2);

        let (before, after) = index.cells_for("87", true);
        assert_eq!(before.images().len(), 1);
        assert_eq!(after, EvidenceCell::MissingAfter);

        let (before, after) = index.cells_for("12", false);
        assert_eq!(before, EvidenceCell::NoEvidence);
        assert_eq!(after.images().len(), 1);

        let (before, after) = index.cells_for("99", false);
        assert_eq!((before, after), (EvidenceCell::NoEvidence, EvidenceCell::NoEvidence));
    }
}
