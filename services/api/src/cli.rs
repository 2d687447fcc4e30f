use crate::report::{run_report_generate, ReportGenerateArgs};
use crate::server;
use audit_report::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Audit Report Service",
    about = "Score food-safety audits and render their compliance reports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with audit reports from the command line
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Assemble, render and optionally persist the report for one audit
    Generate(ReportGenerateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report {
            command: ReportCommand::Generate(args),
        } => run_report_generate(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["audit-report-api"]).expect("empty command line parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn report_generate_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "audit-report-api",
            "report",
            "generate",
            "--document-id",
            "DOC-1001",
            "--data-dir",
            "/srv/audits",
            "--json",
            "--no-artifact",
        ])
        .expect("report command parses");

        let Some(Command::Report {
            command: ReportCommand::Generate(args),
        }) = cli.command
        else {
            panic!("expected report generate");
        };
        assert_eq!(args.document_id, "DOC-1001");
        assert_eq!(args.data_dir, Some(PathBuf::from("/srv/audits")));
        assert!(args.output_dir.is_none());
        assert!(args.json);
        assert!(args.no_artifact);
    }

    #[test]
    fn report_generate_requires_a_document_id() {
        assert!(Cli::try_parse_from(["audit-report-api", "report", "generate"]).is_err());
    }
}
