//! Cross-provider summary reduction

use crate::types::{
    AggregateSummary, AlarmCounts, EnergyTotals, HealthCounts, ProviderStatus,
};

/// Reduces per-provider summaries into system-wide totals
pub struct SummaryBuilder;

impl SummaryBuilder {
    /// Sum every provider's numeric fields.
    ///
    /// Counts, energy and every power figure are summed; only last update
    /// takes the latest. The provider list is kept in input order.
    pub fn build(providers: Vec<ProviderStatus>) -> AggregateSummary {
        let mut stations = HealthCounts::default();
        let mut devices = HealthCounts::default();
        let mut energy = EnergyTotals::default();
        let mut alarms = AlarmCounts::default();
        let mut current_power_kw = 0.0;
        let mut peak_power_kw = 0.0;
        let mut installed_capacity_kw = 0.0;
        let mut last_update = None;

        for status in &providers {
            let summary = status.summary();

            stations += summary.stations;
            devices += summary.devices;
            energy += summary.energy;
            alarms += summary.alarms;
            current_power_kw += finite_or_zero(summary.current_power_kw);
            installed_capacity_kw += finite_or_zero(summary.installed_capacity_kw);
            peak_power_kw += finite_or_zero(summary.peak_power_kw);

            if summary.last_update > last_update {
                last_update = summary.last_update;
            }
        }

        AggregateSummary {
            stations,
            devices,
            energy,
            current_power_kw,
            peak_power_kw,
            installed_capacity_kw,
            alarms,
            last_update,
            providers,
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
