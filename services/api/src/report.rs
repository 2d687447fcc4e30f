use crate::infra::ReportService;
use audit_report::config::AppConfig;
use audit_report::error::AppError;
use audit_report::telemetry;
use audit_report::workflows::audit::{ReportOutcome, ReportSummaryView};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ReportGenerateArgs {
    /// Identifier of the audit document to report on
    #[arg(long)]
    pub(crate) document_id: String,
    /// Override the configured audit data directory
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Override the configured report output directory
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Print the assembled report as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
    /// Skip writing the HTML artifact
    #[arg(long)]
    pub(crate) no_artifact: bool,
}

#[derive(Debug, Serialize)]
struct CliReportOutput {
    #[serde(flatten)]
    outcome: ReportOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<String>,
}

pub(crate) fn run_report_generate(args: ReportGenerateArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data_dir) = args.data_dir {
        config.reports.data_dir = data_dir;
    }
    if let Some(output_dir) = args.output_dir {
        config.reports.output_dir = output_dir;
    }

    telemetry::init(&config.telemetry)?;

    let service = ReportService::from_config(&config.reports)?;
    let result = service.generate(&args.document_id, !args.no_artifact);

    if args.json {
        let output = match &result {
            Ok(report) => CliReportOutput {
                outcome: ReportOutcome {
                    success: true,
                    document: Some(report.document.clone()),
                    error: None,
                },
                artifact: report
                    .artifact
                    .as_ref()
                    .map(|path| path.display().to_string()),
            },
            Err(err) => CliReportOutput {
                outcome: ReportOutcome {
                    success: false,
                    document: None,
                    error: Some(err.to_string()),
                },
                artifact: None,
            },
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(std::io::Error::from)?;
        println!("{rendered}");
        return result.map(|_| ());
    }

    let report = result?;
    print!("{}", ReportSummaryView::from_document(&report.document));
    match report.artifact {
        Some(path) => println!("\nReport written to {}", path.display()),
        None => println!("\nArtifact skipped (--no-artifact)"),
    }
    Ok(())
}
