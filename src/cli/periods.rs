//! `suntrack periods` subcommand

use clap::Args;
use serde_json::json;
use std::fmt::Write as _;

use suntrack::services::TelemetryService;
use suntrack::types::{CanonicalPeriodRecord, Granularity, PeriodKey, PeriodStats};

/// Reconciled per-period series
#[derive(Args, Debug)]
pub struct PeriodsArgs {
    /// Configured provider name
    #[arg(long)]
    pub provider: String,

    /// Station / plant id at the provider
    #[arg(long)]
    pub entity: String,

    /// day, month or year
    #[arg(long, short = 'g')]
    pub granularity: Granularity,

    /// First period (YYYY-MM-DD, YYYY-MM or YYYY)
    #[arg(long)]
    pub from: String,

    /// Last period, inclusive
    #[arg(long)]
    pub to: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PeriodsArgs {
    pub async fn run(self, service: &TelemetryService) -> anyhow::Result<()> {
        let start = PeriodKey::parse(&self.from, self.granularity)?;
        let end = PeriodKey::parse(&self.to, self.granularity)?;

        let records = service
            .reconcile(&self.provider, &self.entity, self.granularity, start, end)
            .await?;
        let stats = PeriodStats::from_records(&records);

        if self.json {
            let body = json!({
                "provider": self.provider,
                "entity": self.entity,
                "granularity": self.granularity,
                "records": records,
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else {
            print!("{}", format_periods(self.granularity, &records, &stats));
        }
        Ok(())
    }
}

fn format_periods(
    granularity: Granularity,
    records: &[CanonicalPeriodRecord],
    stats: &PeriodStats,
) -> String {
    let mut out = String::new();
    if records.is_empty() {
        out.push_str("No periods in range\n");
        return out;
    }

    let _ = writeln!(out, "{:<12} {:>12} {:>10}", granularity.label(), "kWh", "Power kW");
    for record in records {
        let note = if record.synthesized { "  (no data)" } else { "" };
        let _ = writeln!(
            out,
            "{:<12} {:>12.2} {:>10.2}{}",
            record.period_key.to_string(),
            record.value,
            record.instantaneous_power_kw,
            note
        );
    }

    let _ = writeln!(
        out,
        "\nTotal {:.2} kWh · average {:.2} kWh over {} periods with data · coverage {:.0}%",
        stats.total_kwh,
        stats.average_kwh,
        stats.real_periods,
        stats.coverage() * 100.0
    );
    if let Some((key, value)) = &stats.peak_period {
        let _ = writeln!(out, "Peak {} with {:.2} kWh", key, value);
    }
    out
}
