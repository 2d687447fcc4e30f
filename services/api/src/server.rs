use crate::cli::ServeArgs;
use crate::infra::{AppState, ReportService};
use crate::routes::router;
use audit_report::config::AppConfig;
use audit_report::error::AppError;
use audit_report::telemetry;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let reports = Arc::new(ReportService::from_config(&config.reports)?);
    if !reports.is_ready() {
        warn!(
            data_dir = %config.reports.data_dir.display(),
            "audit data directory has no documents folder; /ready will report unavailable"
        );
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        reports,
    };

    let app = router(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "audit report service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
