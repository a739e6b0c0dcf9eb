//! `suntrack resync` subcommand

use clap::Args;

use suntrack::services::TelemetryService;
use suntrack::types::{Granularity, ResyncReport, ResyncStatus};

/// Ask a provider to rebuild period data
#[derive(Args, Debug)]
pub struct ResyncArgs {
    /// Configured provider name
    #[arg(long)]
    pub provider: String,

    /// day, month or year
    #[arg(long, short = 'g')]
    pub granularity: Granularity,

    /// Entity id(s) to resync
    #[arg(long = "entity", required = true, num_args = 1..)]
    pub entities: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ResyncArgs {
    pub async fn run(self, service: &TelemetryService) -> anyhow::Result<()> {
        let report = service
            .resync(&self.provider, self.granularity, &self.entities)
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", format_report(&self.provider, self.granularity, &report));
        }
        Ok(())
    }
}

fn format_report(provider: &str, granularity: Granularity, report: &ResyncReport) -> String {
    let status = match report.status {
        ResyncStatus::Success => "success",
        ResyncStatus::Partial => "partial",
        ResyncStatus::Failure => "failure",
    };
    format!(
        "Resync {} {}: {}, {} processed, {} failed in {}s",
        provider,
        granularity,
        status,
        report.processed,
        report.failed,
        report.duration().as_secs()
    )
}
