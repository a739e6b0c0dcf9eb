mod periods;
mod resync;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;

use suntrack::config::Config;
use suntrack::services::TelemetryService;
use suntrack::types::{AggregateSummary, ProviderStatus};

pub use periods::PeriodsArgs;
pub use resync::ResyncArgs;

/// Multi-provider solar telemetry aggregator
#[derive(Parser)]
#[command(name = "suntrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: $SUNTRACK_CONFIG or ~/.suntrack/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cross-provider summary
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a gap-free per-period series for one entity
    Periods(PeriodsArgs),

    /// Trigger a provider-side resync
    Resync(ResyncArgs),

    /// List configured providers
    Providers,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = Config::resolve_path(self.config)?;
        let config = Config::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;

        match self.command {
            Commands::Providers => {
                print!("{}", format_providers(&config));
                Ok(())
            }
            Commands::Summary { json } => {
                let service = TelemetryService::from_config(&config)?;
                let summary = service.aggregate().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    print!("{}", format_summary(&summary));
                }
                Ok(())
            }
            Commands::Periods(args) => {
                let service = TelemetryService::from_config(&config)?;
                args.run(&service).await
            }
            Commands::Resync(args) => {
                let service = TelemetryService::from_config(&config)?;
                args.run(&service).await
            }
        }
    }
}

fn format_providers(config: &Config) -> String {
    let mut out = String::new();
    for provider in &config.providers {
        let timeout = provider.timeout(config.default_timeout_secs);
        let _ = writeln!(
            out,
            "{:<16} {:<12} {:>4}s  {}",
            provider.name(),
            provider.kind.display_name(),
            timeout.as_secs(),
            provider.base_url()
        );
    }
    out
}

fn format_summary(summary: &AggregateSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<7} {:>9} {:>9} {:>10} {:>10} {:>11} {:>13} {:>8}",
        "Provider",
        "Status",
        "Stations",
        "Power kW",
        "Today kWh",
        "Month kWh",
        "Year kWh",
        "Lifetime kWh",
        "Alarms"
    );

    for status in &summary.providers {
        let s = status.summary();
        let label = match status {
            ProviderStatus::Ok { .. } => "ok",
            ProviderStatus::Failed { .. } => "FAILED",
        };
        let _ = writeln!(
            out,
            "{:<16} {:<7} {:>9} {:>9.2} {:>10.1} {:>10.1} {:>11.1} {:>13.1} {:>8}",
            s.name,
            label,
            format!("{}/{}", s.stations.healthy, s.stations.total),
            s.current_power_kw,
            s.energy.today_kwh,
            s.energy.month_kwh,
            s.energy.year_kwh,
            s.energy.lifetime_kwh,
            s.alarms.total()
        );
    }

    let _ = writeln!(
        out,
        "{:<16} {:<7} {:>9} {:>9.2} {:>10.1} {:>10.1} {:>11.1} {:>13.1} {:>8}",
        "TOTAL",
        "",
        format!("{}/{}", summary.stations.healthy, summary.stations.total),
        summary.current_power_kw,
        summary.energy.today_kwh,
        summary.energy.month_kwh,
        summary.energy.year_kwh,
        summary.energy.lifetime_kwh,
        summary.alarms.total()
    );

    let _ = writeln!(
        out,
        "\nPeak {:.2} kW of {:.1} kWp installed · devices {}/{} healthy · alarms {} critical, {} warning",
        summary.peak_power_kw,
        summary.installed_capacity_kw,
        summary.devices.healthy,
        summary.devices.total,
        summary.alarms.critical,
        summary.alarms.warning
    );
    if let Some(ts) = summary.last_update {
        let _ = writeln!(out, "Last update {}", ts.format("%Y-%m-%d %H:%M UTC"));
    }

    for status in &summary.providers {
        if let ProviderStatus::Failed { summary, reason } = status {
            let _ = writeln!(out, "partial data: {} shown as zero ({})", summary.name, reason);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use suntrack::services::SummaryBuilder;
    use suntrack::types::{Granularity, ProviderKind, UnifiedProviderSummary};

    #[test]
    fn test_cli_parse_summary() {
        let cli = Cli::try_parse_from(["suntrack", "summary"]).unwrap();
        assert!(matches!(cli.command, Commands::Summary { json: false }));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_summary_json_with_global_config() {
        let cli =
            Cli::try_parse_from(["suntrack", "summary", "--json", "--config", "/tmp/s.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Summary { json: true }));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["suntrack"]).is_err());
    }

    #[test]
    fn test_cli_parse_periods() {
        let cli = Cli::try_parse_from([
            "suntrack",
            "periods",
            "--provider",
            "fs",
            "--entity",
            "NE=1",
            "--granularity",
            "month",
            "--from",
            "2024-01",
            "--to",
            "2024-03",
        ])
        .unwrap();
        match cli.command {
            Commands::Periods(args) => {
                assert_eq!(args.provider, "fs");
                assert_eq!(args.granularity, Granularity::Month);
                assert!(!args.json);
            }
            _ => panic!("expected periods"),
        }
    }

    #[test]
    fn test_cli_parse_resync_multiple_entities() {
        let cli = Cli::try_parse_from([
            "suntrack",
            "resync",
            "--provider",
            "fs",
            "--granularity",
            "daily",
            "--entity",
            "a",
            "b",
        ])
        .unwrap();
        match cli.command {
            Commands::Resync(args) => assert_eq!(args.entities, vec!["a", "b"]),
            _ => panic!("expected resync"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_granularity() {
        assert!(Cli::try_parse_from([
            "suntrack",
            "resync",
            "--provider",
            "fs",
            "--granularity",
            "weekly",
            "--entity",
            "a",
        ])
        .is_err());
    }

    #[test]
    fn test_format_summary_marks_failed_provider() {
        let mut ok = UnifiedProviderSummary::zeroed(ProviderKind::FusionSolar, "roof");
        ok.stations.total = 2;
        ok.stations.healthy = 2;
        ok.energy.today_kwh = 12.5;
        let summary = SummaryBuilder::build(vec![
            ProviderStatus::Ok { summary: ok },
            ProviderStatus::failed(ProviderKind::Growatt, "barn", "HTTP 502"),
        ]);

        let text = format_summary(&summary);
        assert!(text.contains("roof"));
        assert!(text.contains("FAILED"));
        assert!(text.contains("TOTAL"));
        assert!(text.contains("partial data: barn shown as zero (HTTP 502)"));
    }

    #[test]
    fn test_format_providers_in_config_order() {
        let config = Config::from_toml_str(
            r#"
[[providers]]
kind = "solis"
name = "garage"
base_url = "https://s/"

[[providers]]
kind = "fusionsolar"
base_url = "https://f"
"#,
            |_| None,
        )
        .unwrap();
        let text = format_providers(&config);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("garage"));
        assert!(lines[0].contains("SolisCloud"));
        assert!(lines[0].ends_with("https://s"));
        assert!(lines[1].starts_with("fusionsolar"));
        assert!(lines[1].contains("15s"));
    }
}
