//! Per-provider and cross-provider summary types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;
use std::time::Duration;

use super::{Result, SuntrackError};

/// Closed set of supported monitoring providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "fusionsolar")]
    FusionSolar,
    #[serde(rename = "solis")]
    SolisCloud,
    #[serde(rename = "growatt")]
    Growatt,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FusionSolar => "fusionsolar",
            Self::SolisCloud => "solis",
            Self::Growatt => "growatt",
        }
    }

    /// Human-readable name for reports
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FusionSolar => "FusionSolar",
            Self::SolisCloud => "SolisCloud",
            Self::Growatt => "Growatt",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = SuntrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fusionsolar" | "huawei" => Ok(Self::FusionSolar),
            "solis" | "soliscloud" => Ok(Self::SolisCloud),
            "growatt" => Ok(Self::Growatt),
            other => Err(SuntrackError::Config(format!("unknown provider '{}'", other))),
        }
    }
}

/// Station or device counts bucketed by health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthCounts {
    pub total: u64,
    pub healthy: u64,
    pub faulty: u64,
    pub offline: u64,
}

impl HealthCounts {
    pub fn record(&mut self, health: Health) {
        self.total = self.total.saturating_add(1);
        match health {
            Health::Healthy => self.healthy = self.healthy.saturating_add(1),
            Health::Faulty => self.faulty = self.faulty.saturating_add(1),
            Health::Offline => self.offline = self.offline.saturating_add(1),
            Health::Unknown => {}
        }
    }
}

impl AddAssign for HealthCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.total = self.total.saturating_add(rhs.total);
        self.healthy = self.healthy.saturating_add(rhs.healthy);
        self.faulty = self.faulty.saturating_add(rhs.faulty);
        self.offline = self.offline.saturating_add(rhs.offline);
    }
}

/// Normalized health state of one station or device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Faulty,
    Offline,
    Unknown,
}

/// Energy figures in kWh
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyTotals {
    pub today_kwh: f64,
    pub month_kwh: f64,
    pub year_kwh: f64,
    pub lifetime_kwh: f64,
}

impl AddAssign for EnergyTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.today_kwh += rhs.today_kwh;
        self.month_kwh += rhs.month_kwh;
        self.year_kwh += rhs.year_kwh;
        self.lifetime_kwh += rhs.lifetime_kwh;
    }
}

/// Active alarm counts by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlarmCounts {
    pub critical: u64,
    pub warning: u64,
    pub other: u64,
}

impl AlarmCounts {
    pub fn total(&self) -> u64 {
        self.critical
            .saturating_add(self.warning)
            .saturating_add(self.other)
    }
}

impl AddAssign for AlarmCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.critical = self.critical.saturating_add(rhs.critical);
        self.warning = self.warning.saturating_add(rhs.warning);
        self.other = self.other.saturating_add(rhs.other);
    }
}

/// Normalized snapshot of one provider account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedProviderSummary {
    pub provider: ProviderKind,
    /// Configured name, unique per configuration
    pub name: String,
    pub stations: HealthCounts,
    pub devices: HealthCounts,
    pub energy: EnergyTotals,
    pub current_power_kw: f64,
    /// Highest single-station power reading
    pub peak_power_kw: f64,
    pub installed_capacity_kw: f64,
    pub alarms: AlarmCounts,
    pub last_update: Option<DateTime<Utc>>,
}

impl UnifiedProviderSummary {
    /// All-zero summary tagged with the provider identity
    pub fn zeroed(provider: ProviderKind, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
            stations: HealthCounts::default(),
            devices: HealthCounts::default(),
            energy: EnergyTotals::default(),
            current_power_kw: 0.0,
            peak_power_kw: 0.0,
            installed_capacity_kw: 0.0,
            alarms: AlarmCounts::default(),
            last_update: None,
        }
    }

    /// Fold one station's readings into the provider totals
    pub fn add_station(&mut self, station: &StationReading) {
        self.stations.record(station.health);
        self.energy += station.energy;
        self.current_power_kw += station.power_kw;
        self.installed_capacity_kw += station.capacity_kw;
        if station.power_kw > self.peak_power_kw {
            self.peak_power_kw = station.power_kw;
        }
        if let Some(ts) = station.updated_at {
            if self.last_update.map_or(true, |current| ts > current) {
                self.last_update = Some(ts);
            }
        }
    }
}

/// One station's normalized readings, produced by an adapter
#[derive(Debug, Clone, PartialEq)]
pub struct StationReading {
    pub health: Health,
    pub energy: EnergyTotals,
    pub power_kw: f64,
    pub capacity_kw: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-provider fetch outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProviderStatus {
    Ok {
        summary: UnifiedProviderSummary,
    },
    Failed {
        summary: UnifiedProviderSummary,
        reason: String,
    },
}

impl ProviderStatus {
    pub fn failed(provider: ProviderKind, name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Failed {
            summary: UnifiedProviderSummary::zeroed(provider, name),
            reason: reason.to_string(),
        }
    }

    pub fn summary(&self) -> &UnifiedProviderSummary {
        match self {
            Self::Ok { summary } | Self::Failed { summary, .. } => summary,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// System-wide totals across all configured providers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub stations: HealthCounts,
    pub devices: HealthCounts,
    pub energy: EnergyTotals,
    pub current_power_kw: f64,
    pub peak_power_kw: f64,
    pub installed_capacity_kw: f64,
    pub alarms: AlarmCounts,
    pub last_update: Option<DateTime<Utc>>,
    pub providers: Vec<ProviderStatus>,
}

impl AggregateSummary {
    /// Names of providers that were substituted with a zeroed summary
    pub fn failed_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| !p.is_ok())
            .map(|p| p.summary().name.as_str())
            .collect()
    }

    /// True when at least one provider degraded to zero
    pub fn is_partial(&self) -> bool {
        self.providers.iter().any(|p| !p.is_ok())
    }
}

/// Outcome reported by a provider-side resync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResyncStatus {
    Success,
    Partial,
    Failure,
}

/// Resync job report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResyncReport {
    pub status: ResyncStatus,
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub failed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ResyncReport {
    /// Wall-clock duration; zero if the provider reports an inverted span
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
