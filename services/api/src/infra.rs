use audit_report::config::ReportConfig;
use audit_report::error::AppError;
use audit_report::workflows::audit::{
    render_html, ArtifactWriter, AuditDocument, BundleStore, ReportAssembler, ReportSources,
    ThresholdProvider,
};
use chrono::Local;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) reports: Arc<ReportService>,
}

/// A rendered report and, when persisted, where its artifact landed.
#[derive(Debug)]
pub(crate) struct GeneratedReport {
    pub(crate) document: AuditDocument,
    pub(crate) html: String,
    pub(crate) artifact: Option<PathBuf>,
}

/// Report pipeline wired to the file-backed data directory.
///
/// One instance serves every request, so the threshold cache inside the
/// assembler is shared across them.
pub(crate) struct ReportService {
    store: BundleStore,
    assembler: ReportAssembler,
    artifacts: ArtifactWriter,
}

impl ReportService {
    pub(crate) fn from_config(config: &ReportConfig) -> Result<Self, AppError> {
        let store = BundleStore::new(config.data_dir.clone());
        let layout = store.layout()?;
        let shared = Arc::new(store.clone());
        let thresholds = Arc::new(ThresholdProvider::new(shared.clone(), config.threshold_ttl));
        let assembler = ReportAssembler::new(ReportSources::from_shared(shared), thresholds, layout)
            .with_attachment_workers(config.attachment_workers);

        info!(
            data_dir = %config.data_dir.display(),
            output_dir = %config.output_dir.display(),
            workers = config.attachment_workers,
            "report service configured"
        );

        Ok(Self {
            store,
            assembler,
            artifacts: ArtifactWriter::new(config.output_dir.clone()),
        })
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub(crate) fn generate(
        &self,
        document_id: &str,
        persist: bool,
    ) -> Result<GeneratedReport, AppError> {
        let document = self.assembler.assemble(document_id)?;
        let html = render_html(&document);
        let artifact = if persist {
            Some(
                self.artifacts
                    .write(&document, &html, Local::now().date_naive())?,
            )
        } else {
            None
        };

        Ok(GeneratedReport {
            document,
            html,
            artifact,
        })
    }
}
