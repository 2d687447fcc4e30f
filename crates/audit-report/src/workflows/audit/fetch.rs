//! Bounded-concurrency evidence download.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

use super::evidence::{AttachmentSource, EvidenceImage, ImageAttachment};
use super::sources::{AttachmentProvider, SourceError};

const FALLBACK_MIME: &str = "image/jpeg";

/// Resolves every attachment into an embeddable image using at most
/// `workers` concurrent fetches.
///
/// Failed fetches are logged and dropped. The result keeps input order, so
/// output never depends on which worker finished first.
pub(crate) fn fetch_evidence(
    provider: &dyn AttachmentProvider,
    attachments: &[ImageAttachment],
    workers: usize,
) -> Vec<EvidenceImage> {
    if attachments.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, attachments.len());
    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let cursor = &cursor;
            scope.spawn(move || loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(attachment) = attachments.get(index) else {
                    break;
                };
                match resolve(provider, attachment) {
                    Ok(image) => {
                        let _ = tx.send((index, image));
                    }
                    Err(err) => warn!(
                        composite_id = %attachment.composite_id,
                        %err,
                        "skipping evidence image"
                    ),
                }
            });
        }
    });
    drop(tx);

    let mut resolved: Vec<(usize, EvidenceImage)> = rx.into_iter().collect();
    resolved.sort_by_key(|(index, _)| *index);
    debug!(
        requested = attachments.len(),
        resolved = resolved.len(),
        workers,
        "evidence fetched"
    );
    resolved.into_iter().map(|(_, image)| image).collect()
}

fn resolve(
    provider: &dyn AttachmentProvider,
    attachment: &ImageAttachment,
) -> Result<EvidenceImage, SourceError> {
    let src = match &attachment.source {
        AttachmentSource::Url(url) => url.clone(),
        AttachmentSource::Path(_) => {
            let bytes = provider.fetch_binary(attachment)?;
            if bytes.is_empty() {
                return Err(SourceError::Malformed(format!(
                    "attachment '{}' is empty",
                    attachment.composite_id
                )));
            }
            data_uri(&attachment.file_name, &bytes)
        }
    };

    Ok(EvidenceImage {
        question_id: attachment.question_id.clone(),
        is_corrective: attachment.is_corrective,
        caption: attachment.file_name.clone(),
        src,
    })
}

/// Self-contained `data:` URI with the MIME type guessed from the file name.
pub fn data_uri(file_name: &str, bytes: &[u8]) -> String {
    let mime = mime_guess::from_path(file_name)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string());
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
